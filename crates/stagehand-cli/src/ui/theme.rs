//! Color theme for the TUI.

use ratatui::style::Color;

/// Spinner frames for running tool calls.
const SPINNER: [&str; 8] = ["✧", "✦", "✶", "✴", "✸", "✴", "✶", "✦"];

/// Frame interval of the spinner, in virtual milliseconds.
const SPINNER_INTERVAL_MS: u128 = 120;

/// Spinner frame for a given elapsed time.
pub(crate) fn spinner_at(elapsed_ms: u128) -> &'static str {
    let len = SPINNER.len() as u128;
    // Safety: both divisors are nonzero constants
    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
    let index = (elapsed_ms / SPINNER_INTERVAL_MS % len) as usize;
    SPINNER[index]
}

/// Color theme - works on both light and dark terminals
#[derive(Debug, Clone)]
pub(crate) struct Theme {
    // ── Conversation ──
    /// User query text
    pub user: Color,
    /// Agent prose
    pub agent: Color,
    /// Muted/metadata text
    pub muted: Color,
    /// Tool names
    pub tool: Color,
    /// Checkpoint questions and pickers
    pub checkpoint: Color,
    /// Streaming cursor
    pub cursor: Color,

    // ── Status ──
    /// Done / complete
    pub success: Color,
    /// Active / generating
    pub active: Color,
    /// Rejected input, warnings
    pub warning: Color,

    // ── Chrome ──
    /// Border color
    pub border: Color,
    /// Focused border color
    pub focus: Color,

    // ── Dashboard ──
    /// Chart bars
    pub bar: Color,
    /// Selected chart bar
    pub bar_selected: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            user: Color::White,
            agent: Color::Gray,
            muted: Color::DarkGray,
            tool: Color::Cyan,
            checkpoint: Color::Yellow,
            cursor: Color::LightCyan,
            success: Color::Green,
            active: Color::Cyan,
            warning: Color::Yellow,
            border: Color::DarkGray,
            focus: Color::Cyan,
            bar: Color::Blue,
            bar_selected: Color::LightMagenta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_cycles() {
        assert_eq!(spinner_at(0), "✧");
        assert_eq!(spinner_at(119), "✧");
        assert_eq!(spinner_at(120), "✦");
        assert_eq!(spinner_at(960), "✧");
    }
}
