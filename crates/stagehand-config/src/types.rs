//! Configuration types for Stagehand.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reveal and progress pacing.
    pub timing: TimingSection,
    /// Slide deck limits.
    pub slides: SlidesSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
    /// Demo shell defaults.
    pub demo: DemoSection,
}

// ---------------------------------------------------------------------------
// TimingSection
// ---------------------------------------------------------------------------

/// Reveal and progress pacing, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    /// Delay between revealed characters of agent text.
    pub text_char_delay_ms: u64,
    /// Delay between revealed characters of slide content.
    pub slide_char_delay_ms: u64,
    /// Delay between tool-call sub-tasks.
    pub tool_subtask_delay_ms: u64,
    /// Cursor blink interval. Only 500 is accepted.
    pub cursor_blink_ms: u64,
    /// Cadence of the legacy stage label.
    pub stage_delay_ms: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            text_char_delay_ms: 30,
            slide_char_delay_ms: 20,
            tool_subtask_delay_ms: 600,
            cursor_blink_ms: 500,
            stage_delay_ms: 400,
        }
    }
}

impl TimingSection {
    /// Agent text delay as a [`Duration`].
    #[must_use]
    pub fn text_char_delay(&self) -> Duration {
        Duration::from_millis(self.text_char_delay_ms)
    }

    /// Slide content delay as a [`Duration`].
    #[must_use]
    pub fn slide_char_delay(&self) -> Duration {
        Duration::from_millis(self.slide_char_delay_ms)
    }

    /// Tool sub-task delay as a [`Duration`].
    #[must_use]
    pub fn tool_subtask_delay(&self) -> Duration {
        Duration::from_millis(self.tool_subtask_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// SlidesSection
// ---------------------------------------------------------------------------

/// Slide deck limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlidesSection {
    /// Slide count used when the user picks nothing usable.
    pub default_count: usize,
    /// Upper bound on the slide count.
    pub max_count: usize,
}

impl Default for SlidesSection {
    fn default() -> Self {
        Self {
            default_count: 6,
            max_count: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["stagehand_engine=debug"]`).
    pub directives: Vec<String>,
    /// Directory for log files. The interactive shell always logs to a file
    /// so the terminal stays clean; `None` uses the platform data directory.
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            file_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DemoSection
// ---------------------------------------------------------------------------

/// Demo shell defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSection {
    /// Scenario run when no query is given (`"sales"` or `"ppt"`).
    pub default_scenario: String,
    /// Snapshot frame width in cells.
    pub snapshot_width: u16,
    /// Snapshot frame height in cells.
    pub snapshot_height: u16,
}

impl Default for DemoSection {
    fn default() -> Self {
        Self {
            default_scenario: "sales".to_owned(),
            snapshot_width: 100,
            snapshot_height: 32,
        }
    }
}
