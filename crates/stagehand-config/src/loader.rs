//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the user config (`$STAGEHAND_HOME/config.toml`, else the
//!    platform config directory)
//! 3. Merge the explicit `--config` file, which must exist
//! 4. Apply `STAGEHAND_*` environment overrides
//! 5. Deserialize merged tree → `Config`
//! 6. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{HOME_VAR, apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration and the files that contributed to it.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The validated configuration.
    pub config: Config,
    /// Files merged over the defaults, lowest precedence first.
    pub loaded_files: Vec<String>,
}

/// Load configuration with the full precedence chain, reading the process
/// environment.
///
/// `explicit` is a file named on the command line. `home_override` replaces
/// the user config directory (tests use a temporary directory).
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, the explicit
/// file cannot be read, or the final configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<LoadedConfig> {
    load_with_env(explicit, home_override, &collect_env_vars())
}

/// [`load`] with an explicit environment snapshot.
///
/// # Errors
///
/// Same as [`load`].
pub fn load_with_env(
    explicit: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<LoadedConfig> {
    // 1. Parse embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut loaded_files = Vec::new();

    // 2. User config.
    if let Some(dir) = user_config_dir(home_override, env_vars) {
        let path = dir.join("config.toml");
        if let Some(overlay) = try_load_file(&path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %path.display(), "loaded user config");
            loaded_files.push(path.display().to_string());
        }
    }

    // 3. Explicit file.
    if let Some(path) = explicit {
        let overlay = read_value(path)?;
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded config file");
        loaded_files.push(path.display().to_string());
    }

    // 4. Environment overrides.
    let env_count = apply_env_overrides(&mut merged, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment overrides");
    }

    // 5. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 6. Validate.
    validate::validate(&config)?;

    Ok(LoadedConfig {
        config,
        loaded_files,
    })
}

/// Load a config from a single file over the embedded defaults' serde
/// defaults (no layering, no environment).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = read_value(path)?;
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Directory holding the user `config.toml`.
fn user_config_dir(
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> Option<PathBuf> {
    if let Some(home) = home_override {
        return Some(home.to_path_buf());
    }
    if let Some(home) = env_vars.get(HOME_VAR).filter(|h| !h.is_empty()) {
        return Some(PathBuf::from(home));
    }
    directories::ProjectDirs::from("", "", "stagehand").map(|d| d.config_dir().to_path_buf())
}

/// Read and parse a file that must exist.
fn read_value(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_checked(path, &content)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races (no separate
/// exists/metadata checks before reading).
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    parse_checked(path, &content).map(Some)
}

fn parse_checked(path: &Path, content: &str) -> ConfigResult<toml::Value> {
    let size = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {size} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }

    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{CHAR_DELAY_VAR, LOG_LEVEL_VAR};

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_deserialize_to_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_with_empty_home() {
        let home = tempfile::tempdir().unwrap();
        let loaded = load_with_env(None, Some(home.path()), &no_env()).unwrap();
        assert_eq!(loaded.config, Config::default());
        assert!(loaded.loaded_files.is_empty());
    }

    #[test]
    fn test_layers_apply_in_order() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[timing]\ntext_char_delay_ms = 10\nslide_char_delay_ms = 11\n",
        )
        .unwrap();
        let explicit = home.path().join("demo.toml");
        std::fs::write(&explicit, "[timing]\nslide_char_delay_ms = 12\n").unwrap();

        let env = HashMap::from([
            (CHAR_DELAY_VAR.to_owned(), "7".to_owned()),
            (LOG_LEVEL_VAR.to_owned(), "debug".to_owned()),
        ]);
        let loaded = load_with_env(Some(&explicit), Some(home.path()), &env).unwrap();

        assert_eq!(loaded.config.timing.text_char_delay_ms, 7);
        assert_eq!(loaded.config.timing.slide_char_delay_ms, 12);
        assert_eq!(loaded.config.timing.tool_subtask_delay_ms, 600);
        assert_eq!(loaded.config.logging.level, "debug");
        assert_eq!(loaded.loaded_files.len(), 2);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let missing = home.path().join("nope.toml");
        let result = load_with_env(Some(&missing), Some(home.path()), &no_env());
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_invalid_merged_value_fails_validation() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join("config.toml"), "[timing]\ncursor_blink_ms = 100\n")
            .unwrap();
        let result = load_with_env(None, Some(home.path()), &no_env());
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[timing\n").unwrap();
        assert!(matches!(load_file(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_try_load_file_missing() {
        let result = try_load_file(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "Expected ValidationError for oversized config, got: {result:?}"
        );
    }
}
