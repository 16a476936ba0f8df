//! Rendering logic for the TUI.
//!
//! The left pane is the transcript; the right pane shows progress chips and
//! whichever panel the engines last opened.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use stagehand_engine::{
    ContextMenu, Panel, RunPhase, ScenarioStepEngine, SlideGenerationEngine, SlideStatus, Step,
    StepKind, TaskStatus, ToolGroupView, parse_inline,
};

use super::Theme;
use super::state::{App, Focus};
use super::theme::spinner_at;

/// Width of chart bars at their maximum value.
const BAR_WIDTH: usize = 24;

/// Cursor glyph shown after streaming text.
const CURSOR: &str = "▌";

// ─── Frame ───────────────────────────────────────────────────────

pub(crate) fn render_frame(frame: &mut Frame, app: &App) {
    let theme = Theme::default();

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(5),    // Transcript + side panel
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, outer[0], app, &theme);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(outer[1]);

    render_transcript(frame, body[0], app, &theme);
    render_side(frame, body[1], app, &theme);
    render_input(frame, outer[2], app, &theme);
    render_status(frame, outer[3], app, &theme);
}

fn pane(title: &str, focused: bool, theme: &Theme) -> Block<'static> {
    let border = if focused { theme.focus } else { theme.border };
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title(format!(" {title} "))
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let mut spans = vec![Span::styled(
        " Stagehand",
        Style::default().fg(theme.user).add_modifier(Modifier::BOLD),
    )];
    if let Some(kind) = app.conversation.kind() {
        spans.push(Span::styled(" · ", Style::default().fg(theme.border)));
        spans.push(Span::styled(kind.to_string(), Style::default().fg(theme.tool)));
    }
    if let Some(engine) = app.conversation.scenario() {
        let (label, color) = match engine.phase() {
            RunPhase::Idle => ("idle", theme.muted),
            RunPhase::Running => ("running", theme.active),
            RunPhase::Paused => ("waiting for you", theme.checkpoint),
            RunPhase::Complete => ("complete", theme.success),
        };
        spans.push(Span::styled(" · ", Style::default().fg(theme.border)));
        spans.push(Span::styled(label, Style::default().fg(color)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ─── Transcript ──────────────────────────────────────────────────

fn render_transcript(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let lines = transcript_lines(app, theme);
    let inner_width = usize::from(area.width.saturating_sub(2)).max(1);
    let inner_height = area.height.saturating_sub(2);
    let rows: usize = lines
        .iter()
        .map(|l| wrapped_rows(l.width(), inner_width))
        .fold(0, usize::saturating_add);
    // Keep the newest lines in view.
    let scroll = u16::try_from(rows)
        .unwrap_or(u16::MAX)
        .saturating_sub(inner_height);

    let paragraph = Paragraph::new(lines)
        .block(pane("Conversation", app.focus == Focus::Groups, theme))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

/// Rows a line takes once wrapped. Word wrapping can need one more row than
/// the character count suggests, so long lines get one row of slack.
fn wrapped_rows(width: usize, inner_width: usize) -> usize {
    if width <= inner_width {
        1
    } else {
        width.div_ceil(inner_width).saturating_add(1)
    }
}

pub(super) fn transcript_lines(app: &App, theme: &Theme) -> Vec<Line<'static>> {
    let muted = Style::default().fg(theme.muted);
    let mut lines = Vec::new();

    let Some(query) = app.conversation.query() else {
        lines.push(Line::styled(
            "Ask for a sales analysis or a slide deck, then press Enter.",
            muted,
        ));
        lines.push(Line::styled(
            "Try \"analyze Q3 sales\" or \"make a deck of the Q3 review\".",
            muted,
        ));
        return lines;
    };

    lines.push(Line::from(vec![
        Span::styled("› ", Style::default().fg(theme.user).add_modifier(Modifier::BOLD)),
        Span::styled(query.to_owned(), Style::default().fg(theme.user)),
    ]));
    lines.push(Line::default());

    let Some(engine) = app.conversation.scenario() else {
        return lines;
    };
    let now_ms = app.scheduler.now().as_millis();
    let groups = engine.groups();
    let focused_group = (app.focus == Focus::Groups)
        .then(|| groups.get(app.focused_group))
        .flatten()
        .map(|g| g.group_id.as_str());
    let mut headed: Vec<&str> = Vec::new();

    let steps = engine
        .completed_steps()
        .map(|s| (s, true))
        .chain(engine.current_step().map(|s| (s, false)));

    for (step, done) in steps {
        let grouped = if let Some(group_id) = step.group_id.as_deref() {
            let Some(view) = groups.iter().find(|g| g.group_id == group_id) else {
                continue;
            };
            if !headed.contains(&group_id) {
                headed.push(group_id);
                lines.push(group_header(view, focused_group == Some(group_id), now_ms, theme));
            }
            if !view.is_expanded {
                continue;
            }
            true
        } else {
            false
        };
        step_lines(&mut lines, engine, step, done, grouped, now_ms, theme);
    }

    if engine.phase() == RunPhase::Complete {
        lines.push(Line::styled("✓ Scenario complete", Style::default().fg(theme.success)));
    }
    if let Some(deck) = app.conversation.slides().filter(|d| d.is_generating()) {
        lines.push(Line::styled(
            format!(
                "{} Generating slides · {}% · {}",
                spinner_at(now_ms),
                deck.progress(),
                deck.stage_label()
            ),
            Style::default().fg(theme.active),
        ));
    }
    lines
}

fn group_header(view: &ToolGroupView, focused: bool, now_ms: u128, theme: &Theme) -> Line<'static> {
    let arrow = if view.is_expanded { "▾" } else { "▸" };
    let (status, color) = if view.is_complete {
        ("✓", theme.success)
    } else if view.is_active {
        (spinner_at(now_ms), theme.active)
    } else {
        ("·", theme.muted)
    };
    let mut label_style = Style::default().fg(theme.tool);
    if focused {
        label_style = label_style.add_modifier(Modifier::REVERSED);
    }
    Line::from(vec![
        Span::styled(format!("{arrow} "), Style::default().fg(theme.muted)),
        Span::styled(view.group_id.clone(), label_style),
        Span::styled(
            format!(" · {} tools ", view.step_ids.len()),
            Style::default().fg(theme.muted),
        ),
        Span::styled(status, Style::default().fg(color)),
    ])
}

fn step_lines(
    lines: &mut Vec<Line<'static>>,
    engine: &ScenarioStepEngine,
    step: &Step,
    done: bool,
    grouped: bool,
    now_ms: u128,
    theme: &Theme,
) {
    let indent = if grouped { "  " } else { "" };
    match &step.kind {
        StepKind::AgentText { text } => {
            if done {
                lines.extend(markup_lines(text, false, theme));
            } else if let Some(stream) = engine.active_text() {
                lines.extend(markup_lines(stream.revealed(), stream.cursor_visible(), theme));
            }
            lines.push(Line::default());
        },
        StepKind::ToolCall(call) => {
            let progress = engine.tool_progress().filter(|_| !done);
            let (icon, color) = if done {
                ("✓", theme.success)
            } else {
                (spinner_at(now_ms), theme.active)
            };
            let mut spans = vec![
                Span::raw(indent.to_owned()),
                Span::styled(format!("{icon} "), Style::default().fg(color)),
                Span::styled(call.tool.clone(), Style::default().fg(theme.tool)),
                Span::styled(format!(" {}", call.description), Style::default().fg(theme.muted)),
            ];
            if let Some(p) = progress {
                spans.push(Span::styled(
                    format!(" [{}/{}]", p.done, p.total),
                    Style::default().fg(theme.active),
                ));
            }
            lines.push(Line::from(spans));

            if let Some(p) = progress {
                for (i, subtask) in call.subtasks.iter().enumerate() {
                    let (mark, style) = if i < p.done {
                        ("✓", Style::default().fg(theme.success))
                    } else if i == p.done {
                        (spinner_at(now_ms), Style::default().fg(theme.active))
                    } else {
                        ("·", Style::default().fg(theme.muted))
                    };
                    lines.push(Line::from(vec![
                        Span::raw(format!("{indent}    ")),
                        Span::styled(format!("{mark} {subtask}"), style),
                    ]));
                }
            }
        },
        StepKind::HitlCheckpoint(cp) => {
            let accent = Style::default().fg(theme.checkpoint);
            lines.push(Line::styled(format!("? {}", cp.question), accent.add_modifier(Modifier::BOLD)));
            match engine.selection(&step.id).filter(|_| done) {
                Some(value) => {
                    let label = cp
                        .options
                        .iter()
                        .find(|o| o.value == value)
                        .map_or(value, |o| o.label.as_str());
                    lines.push(Line::styled(format!("  → {label}"), Style::default().fg(theme.success)));
                },
                None => {
                    for (i, option) in cp.options.iter().enumerate() {
                        lines.push(Line::from(vec![
                            Span::styled(format!("  [{}] ", i.saturating_add(1)), accent),
                            Span::styled(option.label.clone(), Style::default().fg(theme.user)),
                        ]));
                    }
                    if !cp.scopes.is_empty() {
                        lines.push(Line::styled(
                            format!("  Scope: {}", cp.scopes.join(", ")),
                            Style::default().fg(theme.muted),
                        ));
                    }
                    lines.push(Line::styled(
                        format!("  Press 1-{} to choose", cp.options.len()),
                        Style::default().fg(theme.muted),
                    ));
                },
            }
            lines.push(Line::default());
        },
    }
}

/// Split revealed text into styled lines. Only closed `**` pairs are bold.
fn markup_lines(text: &str, cursor: bool, theme: &Theme) -> Vec<Line<'static>> {
    let base = Style::default().fg(theme.agent);
    let mut lines: Vec<Vec<Span<'static>>> = vec![Vec::new()];
    for segment in parse_inline(text) {
        let style = if segment.bold {
            base.add_modifier(Modifier::BOLD)
        } else {
            base
        };
        for (i, piece) in segment.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(Vec::new());
            }
            if piece.is_empty() {
                continue;
            }
            if let Some(line) = lines.last_mut() {
                line.push(Span::styled(piece.to_owned(), style));
            }
        }
    }
    if cursor {
        if let Some(line) = lines.last_mut() {
            line.push(Span::styled(CURSOR, Style::default().fg(theme.cursor)));
        }
    }
    lines.into_iter().map(Line::from).collect()
}

// ─── Side panel ──────────────────────────────────────────────────

fn render_side(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let task_rows = app
        .conversation
        .scenario()
        .map_or(1, |s| s.progress_tasks().len().max(1));
    let chips_height = u16::try_from(task_rows)
        .unwrap_or(u16::MAX)
        .saturating_add(2)
        .min(area.height.saturating_div(3));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(chips_height), Constraint::Min(3)])
        .split(area);

    render_progress(frame, chunks[0], app, theme);
    match app.conversation.panel() {
        Some(Panel::Dashboard) => render_dashboard(frame, chunks[1], app, theme),
        Some(Panel::SlidePreview) => render_slides(frame, chunks[1], app, theme),
        Some(Panel::Artifacts) => render_artifacts(frame, chunks[1], app, theme),
        None => {
            let hint = Paragraph::new(Line::styled(
                "Panels open here as the agent works.",
                Style::default().fg(theme.muted),
            ))
            .block(pane("Panel", false, theme));
            frame.render_widget(hint, chunks[1]);
        },
    }
}

fn render_progress(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let tasks = app
        .conversation
        .scenario()
        .map(ScenarioStepEngine::progress_tasks)
        .unwrap_or_default();
    let now_ms = app.scheduler.now().as_millis();
    let lines: Vec<Line> = if tasks.is_empty() {
        vec![Line::styled("No tasks yet", Style::default().fg(theme.muted))]
    } else {
        tasks
            .into_iter()
            .map(|task| {
                let (icon, color) = match task.status {
                    TaskStatus::Done => ("✓", theme.success),
                    TaskStatus::Active => (spinner_at(now_ms), theme.active),
                    TaskStatus::Pending => ("○", theme.muted),
                };
                Line::from(vec![
                    Span::styled(format!("{icon} "), Style::default().fg(color)),
                    Span::styled(task.label, Style::default().fg(theme.user)),
                ])
            })
            .collect()
    };
    frame.render_widget(Paragraph::new(lines).block(pane("Progress", false, theme)), area);
}

fn render_dashboard(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let drill = app.conversation.drill();
    let chart_id = app.chart_id();
    let mut lines = Vec::new();

    let crumbs = drill.breadcrumbs(chart_id);
    let mut crumb_spans = Vec::new();
    for (i, crumb) in crumbs.iter().enumerate() {
        if i > 0 {
            crumb_spans.push(Span::styled(" > ", Style::default().fg(theme.border)));
        }
        crumb_spans.push(Span::styled(crumb.clone(), Style::default().fg(theme.tool)));
    }
    lines.push(Line::from(crumb_spans));
    lines.push(Line::default());

    let series = drill.series(chart_id).unwrap_or_default();
    let max = series.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    for (i, point) in series.iter().enumerate() {
        let selected = app.focus == Focus::Dashboard && i == app.selected_point;
        let color = if selected { theme.bar_selected } else { theme.bar };
        let marker = if selected { "›" } else { " " };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{:<11}", point.label), Style::default().fg(theme.user)),
            Span::styled(bar(point.value, max), Style::default().fg(color)),
            Span::styled(format!(" {:.1}", point.value), Style::default().fg(theme.muted)),
        ]));
    }

    let title = format!("Dashboard · {chart_id}");
    let block = pane(&title, app.focus == Focus::Dashboard, theme);
    let inner = block.inner(area);
    frame.render_widget(Paragraph::new(lines).block(block), area);

    if let Some(menu) = drill.menu().filter(|m| m.chart_id == chart_id) {
        render_menu(frame, inner, menu, theme);
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    // Safety: float ratio of a positive value to a positive max, for display
    #[allow(clippy::arithmetic_side_effects)]
    let filled = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled.clamp(1, BAR_WIDTH))
}

fn render_menu(frame: &mut Frame, inner: Rect, menu: &ContextMenu, theme: &Theme) {
    let mut lines = vec![Line::styled(
        format!("{} ({:.1})", menu.element_name, menu.value),
        Style::default().fg(theme.user).add_modifier(Modifier::BOLD),
    )];
    for (i, item) in menu.items.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("[{}] ", i.saturating_add(1)), Style::default().fg(theme.checkpoint)),
            Span::styled(item.label.clone(), Style::default().fg(theme.user)),
        ]));
    }
    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    let x = inner.x.saturating_add(menu.position.x);
    let y = inner.y.saturating_add(menu.position.y);
    let area = Rect {
        x,
        y,
        width: 26_u16.min(inner.right().saturating_sub(x)),
        height: height.min(inner.bottom().saturating_sub(y)),
    };
    if area.width < 4 || area.height < 3 {
        return;
    }
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(pane("Drill into", true, theme)),
        area,
    );
}

fn render_slides(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let Some(deck) = app.conversation.slides() else {
        return;
    };
    let now_ms = app.scheduler.now().as_millis();
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{}/{} slides ", deck.completed_count(), deck.slide_count()),
            Style::default().fg(theme.user),
        ),
        Span::styled(format!("{}% ", deck.progress()), Style::default().fg(theme.active)),
        Span::styled(deck.stage_label(), Style::default().fg(theme.muted)),
    ])];

    for item in deck.slides() {
        let (icon, color) = match item.status {
            SlideStatus::Completed => ("✓", theme.success),
            SlideStatus::Generating => (spinner_at(now_ms), theme.active),
            SlideStatus::Pending => ("○", theme.muted),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{icon} {:>2}. ", item.id), Style::default().fg(color)),
            Span::styled(item.content.title, Style::default().fg(theme.user)),
        ]));
    }

    if let Some(id) = preview_slide(deck) {
        lines.push(Line::default());
        lines.extend(slide_preview(deck, id, theme));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .block(pane("Slides", false, theme))
            .wrap(Wrap { trim: false }),
        area,
    );
}

/// The generating slide, else the last completed one.
fn preview_slide(deck: &SlideGenerationEngine) -> Option<usize> {
    deck.current_slide()
        .or_else(|| (deck.completed_count() > 0).then_some(deck.completed_count()))
}

fn slide_preview(deck: &SlideGenerationEngine, id: usize, theme: &Theme) -> Vec<Line<'static>> {
    let Some(slide) = deck.revealed(id) else {
        return Vec::new();
    };
    let mut lines = vec![Line::styled(
        slide.title.to_owned(),
        Style::default().fg(theme.user).add_modifier(Modifier::BOLD),
    )];
    if !slide.subtitle.is_empty() {
        lines.push(Line::styled(slide.subtitle.to_owned(), Style::default().fg(theme.muted)));
    }
    for bullet in slide.bullets {
        lines.push(Line::styled(format!("  • {bullet}"), Style::default().fg(theme.agent)));
    }
    lines
}

fn render_artifacts(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let lines: Vec<Line> = app
        .conversation
        .artifacts()
        .iter()
        .map(|artifact| {
            Line::from(vec![
                Span::styled("▣ ", Style::default().fg(theme.success)),
                Span::styled(artifact.title.clone(), Style::default().fg(theme.user)),
                Span::styled(
                    format!(
                        " · {} slides · {}",
                        artifact.slide_count,
                        artifact.created_at.format("%H:%M:%S")
                    ),
                    Style::default().fg(theme.muted),
                ),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(pane("Artifacts", false, theme)), area);
}

// ─── Input + status ──────────────────────────────────────────────

fn render_input(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let focused = app.focus == Focus::Input;
    let line = if app.input.is_empty() && !focused {
        Line::styled("Tab to return here", Style::default().fg(theme.muted))
    } else if app.input.is_empty() && app.is_active() {
        Line::styled("/reset to start over", Style::default().fg(theme.muted))
    } else {
        let mut spans = vec![Span::styled(app.input.clone(), Style::default().fg(theme.user))];
        if focused {
            spans.push(Span::styled(CURSOR, Style::default().fg(theme.cursor)));
        }
        Line::from(spans)
    };
    frame.render_widget(Paragraph::new(line).block(pane("Ask", focused, theme)), area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let mut spans = vec![
        Span::styled(format!(" [{}]", app.focus.label()), Style::default().fg(theme.tool)),
        Span::styled(
            format!(" t+{:.1}s", app.scheduler.now().as_secs_f64()),
            Style::default().fg(theme.muted),
        ),
    ];
    if let Some(last) = app.recent_events.back() {
        spans.push(Span::styled(format!(" · {last}"), Style::default().fg(theme.muted)));
    }
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(format!(" · {notice}"), Style::default().fg(theme.warning)));
    } else if app.quit_pending {
        spans.push(Span::styled(" · Ctrl+C again to quit", Style::default().fg(theme.warning)));
    } else {
        let hint = match app.focus {
            Focus::Input => " · Enter send · Tab focus",
            Focus::Groups => " · ↑↓ group · Space toggle · r reset",
            Focus::Dashboard => " · ←→ bar · Enter drill · Bksp back · c chart",
        };
        spans.push(Span::styled(hint, Style::default().fg(theme.border)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::state::tests::{fast_app, run_to_pause_or_end};

    fn text_of(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_markup_hides_closed_markers_only() {
        let theme = Theme::default();
        let closed = markup_lines("Q3 **up** 12%", false, &theme);
        assert_eq!(text_of(&closed), "Q3 up 12%");
        assert!(closed[0].spans[1].style.add_modifier.contains(Modifier::BOLD));

        let open = markup_lines("Q3 **u", true, &theme);
        assert_eq!(text_of(&open), "Q3 **u▌");
    }

    #[test]
    fn test_markup_splits_lines() {
        let theme = Theme::default();
        let lines = markup_lines("one\n**two**", false, &theme);
        assert_eq!(lines.len(), 2);
        assert_eq!(text_of(&lines), "one\ntwo");
    }

    #[test]
    fn test_transcript_before_query() {
        let app = fast_app();
        let text = text_of(&transcript_lines(&app, &Theme::default()));
        assert!(text.contains("Ask for a sales analysis"));
    }

    #[test]
    fn test_transcript_shows_checkpoint_picker() {
        let mut app = fast_app();
        app.submit("analyze Q3 sales");
        run_to_pause_or_end(&mut app);

        let text = text_of(&transcript_lines(&app, &Theme::default()));
        assert!(text.starts_with("› analyze Q3 sales"));
        assert!(text.contains("Q3 sales"));
        assert!(text.contains("? Which scope should the analysis cover?"));
        assert!(text.contains("[2] Headline numbers only"));
        assert!(text.contains("Scope: East, West, North, South"));
        // The finished "data" group is collapsed to its header.
        assert!(text.contains("▸ data · 2 tools ✓"));
        assert!(!text.contains("sql_query"));
    }

    #[test]
    fn test_toggled_group_shows_members() {
        let mut app = fast_app();
        app.submit("analyze Q3 sales");
        run_to_pause_or_end(&mut app);
        assert!(app.toggle_focused_group());

        let text = text_of(&transcript_lines(&app, &Theme::default()));
        assert!(text.contains("▾ data"));
        assert!(text.contains("✓ sql_query"));
    }

    #[test]
    fn test_bar_scales_to_max() {
        assert_eq!(bar(10.0, 10.0).chars().count(), BAR_WIDTH);
        assert_eq!(bar(5.0, 10.0).chars().count(), 12);
        assert_eq!(bar(0.01, 10.0).chars().count(), 1);
        assert!(bar(1.0, 0.0).is_empty());
    }
}
