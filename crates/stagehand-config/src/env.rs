//! `STAGEHAND_*` environment overrides.
//!
//! Environment variables sit above every config file. Only a small, fixed
//! set of variables is recognised.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::set_path;

/// Prefix of every recognised variable.
pub const ENV_PREFIX: &str = "STAGEHAND_";

/// Overrides `logging.level`.
pub const LOG_LEVEL_VAR: &str = "STAGEHAND_LOG_LEVEL";

/// Overrides `timing.text_char_delay_ms`.
pub const CHAR_DELAY_VAR: &str = "STAGEHAND_CHAR_DELAY_MS";

/// Points at the directory holding the user `config.toml`.
pub const HOME_VAR: &str = "STAGEHAND_HOME";

/// Snapshot the `STAGEHAND_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect()
}

/// Apply recognised overrides to the merged tree. Returns how many were
/// applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] when a numeric variable does not parse.
pub fn apply_env_overrides(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let mut applied: usize = 0;

    if let Some(level) = env_vars.get(LOG_LEVEL_VAR) {
        set_path(merged, "logging.level", toml::Value::String(level.trim().to_owned()));
        debug!(var = LOG_LEVEL_VAR, "applied environment override");
        applied = applied.saturating_add(1);
    }

    if let Some(raw) = env_vars.get(CHAR_DELAY_VAR) {
        let delay: i64 = raw.trim().parse().map_err(|_| ConfigError::EnvError {
            var_name: CHAR_DELAY_VAR.to_owned(),
            message: format!("'{raw}' is not a whole number of milliseconds"),
        })?;
        set_path(merged, "timing.text_char_delay_ms", toml::Value::Integer(delay));
        debug!(var = CHAR_DELAY_VAR, "applied environment override");
        applied = applied.saturating_add(1);
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let env = HashMap::from([
            (LOG_LEVEL_VAR.to_owned(), "debug".to_owned()),
            (CHAR_DELAY_VAR.to_owned(), " 5 ".to_owned()),
        ]);
        assert_eq!(apply_env_overrides(&mut merged, &env).unwrap(), 2);
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(merged["timing"]["text_char_delay_ms"].as_integer(), Some(5));
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let env = HashMap::from([(CHAR_DELAY_VAR.to_owned(), "fast".to_owned())]);
        assert!(matches!(
            apply_env_overrides(&mut merged, &env),
            Err(ConfigError::EnvError { .. })
        ));
    }

    #[test]
    fn test_unrelated_vars_ignored() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let env = HashMap::from([("STAGEHAND_OTHER".to_owned(), "x".to_owned())]);
        assert_eq!(apply_env_overrides(&mut merged, &env).unwrap(), 0);
    }
}
