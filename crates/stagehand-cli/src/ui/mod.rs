//! UI module - terminal interface and rendering.

mod input;
mod render;
pub(crate) mod state;
mod theme;

pub(crate) use input::handle_input;
pub(crate) use render::render_frame;
pub(crate) use state::App;
pub(crate) use theme::Theme;

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend, backend::TestBackend, style::Color};
use std::io::{self, Stdout};

/// Type alias for our terminal
pub(crate) type Term = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub(crate) fn init_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore terminal to normal mode
pub(crate) fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Render one frame off-screen and return it as text, with ANSI colors when
/// `color` is set.
pub(crate) fn render_snapshot(app: &App, width: u16, height: u16, color: bool) -> io::Result<String> {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend)?;
    terminal.draw(|frame| render_frame(frame, app))?;

    // Only emit color codes when color changes to reduce verbosity
    let buffer = terminal.backend().buffer();
    let mut output = String::new();
    for y in 0..buffer.area.height {
        let mut last_fg = Color::Reset;
        for x in 0..buffer.area.width {
            let cell = &buffer[(x, y)];
            if color && cell.fg != last_fg {
                output.push_str(color_to_ansi(cell.fg));
                last_fg = cell.fg;
            }
            output.push_str(cell.symbol());
        }
        if color {
            output.push_str("\x1b[0m");
        }
        output.push('\n');
    }
    Ok(output)
}

/// Convert ratatui color to ANSI escape code
fn color_to_ansi(color: Color) -> &'static str {
    match color {
        Color::Black => "\x1b[30m",
        Color::Red => "\x1b[31m",
        Color::Green => "\x1b[32m",
        Color::Yellow => "\x1b[33m",
        Color::Blue => "\x1b[34m",
        Color::Magenta => "\x1b[35m",
        Color::Cyan => "\x1b[36m",
        Color::Gray => "\x1b[37m",
        Color::DarkGray => "\x1b[90m",
        Color::LightRed => "\x1b[91m",
        Color::LightGreen => "\x1b[92m",
        Color::LightYellow => "\x1b[93m",
        Color::LightBlue => "\x1b[94m",
        Color::LightMagenta => "\x1b[95m",
        Color::LightCyan => "\x1b[96m",
        Color::White => "\x1b[97m",
        _ => "\x1b[39m",
    }
}
