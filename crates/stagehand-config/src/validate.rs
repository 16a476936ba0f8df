//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Longest accepted per-character or per-task delay.
const MAX_DELAY_MS: u64 = 10_000;

/// The only supported cursor blink interval.
const CURSOR_BLINK_MS: u64 = 500;

/// Largest deck a user may ask for.
const MAX_SLIDES_UPPER_BOUND: usize = 100;

/// Scenario names the shell knows how to start.
const SCENARIOS: [&str; 2] = ["sales", "ppt"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_timing(config)?;
    validate_slides(config)?;
    validate_logging(config)?;
    validate_demo(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_timing(config: &Config) -> ConfigResult<()> {
    let t = &config.timing;
    for (field, value) in [
        ("timing.text_char_delay_ms", t.text_char_delay_ms),
        ("timing.slide_char_delay_ms", t.slide_char_delay_ms),
        ("timing.tool_subtask_delay_ms", t.tool_subtask_delay_ms),
        ("timing.stage_delay_ms", t.stage_delay_ms),
    ] {
        if value == 0 || value > MAX_DELAY_MS {
            return Err(invalid(
                field,
                format!("{value} is out of range; must be between 1 and {MAX_DELAY_MS}"),
            ));
        }
    }

    if t.cursor_blink_ms != CURSOR_BLINK_MS {
        return Err(invalid(
            "timing.cursor_blink_ms",
            format!("cursor blink is fixed at {CURSOR_BLINK_MS} ms"),
        ));
    }
    Ok(())
}

fn validate_slides(config: &Config) -> ConfigResult<()> {
    let s = &config.slides;
    if s.max_count == 0 || s.max_count > MAX_SLIDES_UPPER_BOUND {
        return Err(invalid(
            "slides.max_count",
            format!("max_count must be between 1 and {MAX_SLIDES_UPPER_BOUND}"),
        ));
    }
    if s.default_count == 0 || s.default_count > s.max_count {
        return Err(invalid(
            "slides.default_count",
            format!("default_count must be between 1 and max_count ({})", s.max_count),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.to_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "invalid log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "invalid log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }
    Ok(())
}

fn validate_demo(config: &Config) -> ConfigResult<()> {
    let d = &config.demo;
    if !SCENARIOS.contains(&d.default_scenario.as_str()) {
        return Err(invalid(
            "demo.default_scenario",
            format!(
                "unknown scenario '{}'; expected one of: {}",
                d.default_scenario,
                SCENARIOS.join(", ")
            ),
        ));
    }
    if d.snapshot_width < 40 {
        return Err(invalid("demo.snapshot_width", "must be at least 40 columns"));
    }
    if d.snapshot_height < 12 {
        return Err(invalid("demo.snapshot_height", "must be at least 12 rows"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_delay_rejected() {
        let mut config = Config::default();
        config.timing.tool_subtask_delay_ms = 0;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "timing.tool_subtask_delay_ms"
        );
    }

    #[test]
    fn test_cursor_blink_is_fixed() {
        let mut config = Config::default();
        config.timing.cursor_blink_ms = 250;
        assert_eq!(field_of(validate(&config).unwrap_err()), "timing.cursor_blink_ms");
    }

    #[test]
    fn test_default_count_must_fit_max() {
        let mut config = Config::default();
        config.slides.max_count = 4;
        assert_eq!(field_of(validate(&config).unwrap_err()), "slides.default_count");

        config.slides.default_count = 4;
        assert!(validate(&config).is_ok());

        config.slides.max_count = 0;
        assert_eq!(field_of(validate(&config).unwrap_err()), "slides.max_count");
    }

    #[test]
    fn test_invalid_logging() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.level");

        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.format");
    }

    #[test]
    fn test_invalid_demo() {
        let mut config = Config::default();
        config.demo.default_scenario = "crm".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "demo.default_scenario");

        let mut config = Config::default();
        config.demo.snapshot_height = 5;
        assert_eq!(field_of(validate(&config).unwrap_err()), "demo.snapshot_height");
    }
}
