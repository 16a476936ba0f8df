//! Bridge from `stagehand_config::Config` to engine and telemetry types.
//!
//! The config crate has no dependencies on other stagehand crates, so every
//! config-to-domain conversion happens here, once.

use std::path::PathBuf;

use stagehand_config::Config;
use stagehand_engine::{ConversationSettings, ScenarioKind, ScenarioTiming};
use stagehand_telemetry::{LogConfig, LogFormat, LogTarget, TelemetryResult};

/// Convert config to [`ConversationSettings`].
#[must_use]
pub(crate) fn to_conversation_settings(cfg: &Config) -> ConversationSettings {
    ConversationSettings {
        timing: ScenarioTiming::default()
            .with_text_char_delay(cfg.timing.text_char_delay())
            .with_tool_subtask_delay(cfg.timing.tool_subtask_delay()),
        slide_char_delay: cfg.timing.slide_char_delay(),
        default_slide_count: cfg.slides.default_count,
        max_slide_count: cfg.slides.max_count,
    }
}

/// Scenario started when no query is given.
#[must_use]
pub(crate) fn default_scenario(cfg: &Config) -> ScenarioKind {
    ScenarioKind::from_script_name(&cfg.demo.default_scenario)
        .unwrap_or(ScenarioKind::SalesAnalysis)
}

/// Convert config to [`LogConfig`].
///
/// The interactive shell owns the terminal, so it always logs to a file:
/// `logging.file_dir` when set, else the platform data directory. Snapshot
/// mode prints frames on stdout and logs to stderr unless a directory is
/// configured.
///
/// # Errors
///
/// Returns an error if `logging.format` is not a known format.
pub(crate) fn to_log_config(cfg: &Config, interactive: bool) -> TelemetryResult<LogConfig> {
    let mut log_config = LogConfig::from_section(&cfg.logging)?;
    if interactive && cfg.logging.file_dir.is_none() {
        log_config = log_config.with_target(LogTarget::File(default_log_dir()));
    }
    Ok(log_config)
}

/// Fallback when the config cannot be loaded at all.
#[must_use]
pub(crate) fn fallback_log_config(interactive: bool) -> LogConfig {
    let log_config = LogConfig::new("info").with_format(LogFormat::Compact);
    if interactive {
        log_config.with_target(LogTarget::File(default_log_dir()))
    } else {
        log_config
    }
}

fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "stagehand").map_or_else(
        || std::env::temp_dir().join("stagehand").join("logs"),
        |d| d.data_local_dir().join("logs"),
    )
}
