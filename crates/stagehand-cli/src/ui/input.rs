//! Input handling for the TUI.

use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::state::{App, Focus};

/// Read one terminal event and apply it.
pub(crate) fn handle_input(app: &mut App) -> io::Result<()> {
    if let Event::Key(key) = event::read()? {
        // Windows reports releases too
        if key.kind == KeyEventKind::Press {
            handle_key(app, key);
        }
    }
    Ok(())
}

/// Apply one key press.
pub(crate) fn handle_key(app: &mut App, key: KeyEvent) {
    match (key.code, key.modifiers) {
        // Quit: double Ctrl+C to confirm
        (KeyCode::Char('c' | 'd'), KeyModifiers::CONTROL) => {
            if app.quit_pending {
                app.should_quit = true;
            } else {
                app.quit_pending = true;
            }
            return; // Don't reset quit_pending below
        },
        (KeyCode::Tab, _) => app.focus = app.focus.next(),
        (KeyCode::Esc, _) => {
            if app.conversation.drill().menu().is_some() {
                app.conversation.drill_mut().close_menu();
            } else {
                app.focus = Focus::Input;
            }
        },
        _ => match app.focus {
            Focus::Input => handle_input_key(app, key),
            Focus::Groups => handle_groups_key(app, key),
            Focus::Dashboard => handle_dashboard_key(app, key),
        },
    }
    app.quit_pending = false;
}

/// Digit `1`-`9` as a zero-based index.
fn digit_index(code: KeyCode) -> Option<usize> {
    match code {
        KeyCode::Char(c @ '1'..='9') => c
            .to_digit(10)
            .and_then(|d| usize::try_from(d).ok())
            .and_then(|d| d.checked_sub(1)),
        _ => None,
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => {
            app.input.pop();
        },
        // Digits answer a checkpoint when nothing is being typed
        code if app.input.is_empty() && app.awaiting_choice() && digit_index(code).is_some() => {
            if let Some(index) = digit_index(code) {
                app.answer(index);
            }
        },
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.input.push(c),
        _ => {},
    }
}

fn handle_groups_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.cycle_group(true),
        KeyCode::Up | KeyCode::Char('k') => app.cycle_group(false),
        KeyCode::Char(' ') | KeyCode::Enter => {
            app.toggle_focused_group();
        },
        KeyCode::Char('r') => app.reset(),
        code => {
            if let Some(index) = digit_index(code) {
                app.answer(index);
            }
        },
    }
}

fn handle_dashboard_key(app: &mut App, key: KeyEvent) {
    let menu_open = app.conversation.drill().menu().is_some();
    match key.code {
        KeyCode::Left | KeyCode::Up => app.move_selection(false),
        KeyCode::Right | KeyCode::Down => app.move_selection(true),
        KeyCode::Enter => {
            app.open_menu();
        },
        KeyCode::Backspace => {
            app.drill_back();
        },
        KeyCode::Char('c') => app.next_chart(),
        KeyCode::Char('r') => app.reset(),
        code => match digit_index(code) {
            Some(index) if menu_open => {
                app.pick_dimension(index);
            },
            Some(index) => {
                app.answer(index);
            },
            None => {},
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::state::tests::{fast_app, run_to_pause_or_end};

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_typing_and_submit() {
        let mut app = fast_app();
        type_str(&mut app, "analyze sales!");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input, "analyze sales");

        press(&mut app, KeyCode::Enter);
        assert!(app.is_active());
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_double_ctrl_c_quits() {
        let mut app = fast_app();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        handle_key(&mut app, ctrl_c);
        assert!(app.quit_pending);
        assert!(!app.should_quit);
        handle_key(&mut app, ctrl_c);
        assert!(app.should_quit);
    }

    #[test]
    fn test_other_key_cancels_quit() {
        let mut app = fast_app();
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        press(&mut app, KeyCode::Char('x'));
        assert!(!app.quit_pending);
    }

    #[test]
    fn test_tab_cycles_focus() {
        let mut app = fast_app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Groups);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Dashboard);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.focus, Focus::Input);
    }

    #[test]
    fn test_digit_answers_checkpoint() {
        let mut app = fast_app();
        app.submit("analyze sales");
        run_to_pause_or_end(&mut app);
        assert!(app.awaiting_choice());

        press(&mut app, KeyCode::Char('2'));
        assert!(!app.awaiting_choice());
        assert!(app.input.is_empty());
        let engine = app.conversation.scenario().unwrap();
        assert_eq!(engine.selection("scope"), Some("quick"));
    }

    #[test]
    fn test_digits_type_when_not_paused() {
        let mut app = fast_app();
        type_str(&mut app, "42");
        assert_eq!(app.input, "42");
    }

    #[test]
    fn test_space_toggles_group() {
        let mut app = fast_app();
        app.submit("analyze sales");
        run_to_pause_or_end(&mut app);
        press(&mut app, KeyCode::Tab);

        let expanded = |app: &App| app.conversation.scenario().unwrap().groups()[0].is_expanded;
        assert!(!expanded(&app));
        press(&mut app, KeyCode::Char(' '));
        assert!(expanded(&app));
        press(&mut app, KeyCode::Char(' '));
        assert!(!expanded(&app));
    }

    #[test]
    fn test_dashboard_keys_drill() {
        let mut app = fast_app();
        app.focus = Focus::Dashboard;

        press(&mut app, KeyCode::Enter);
        assert!(app.conversation.drill().menu().is_some());
        press(&mut app, KeyCode::Char('1'));
        let state = app.conversation.drill().state().unwrap();
        assert_eq!(state.element_name, "East");
        assert_eq!(state.dimension_id, "product");

        press(&mut app, KeyCode::Backspace);
        assert!(app.conversation.drill().state().is_none());

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);
        assert!(app.conversation.drill().menu().is_none());
        assert_eq!(app.focus, Focus::Dashboard);
    }

    #[test]
    fn test_digit_index() {
        assert_eq!(digit_index(KeyCode::Char('1')), Some(0));
        assert_eq!(digit_index(KeyCode::Char('9')), Some(8));
        assert_eq!(digit_index(KeyCode::Char('0')), None);
        assert_eq!(digit_index(KeyCode::Enter), None);
    }
}
