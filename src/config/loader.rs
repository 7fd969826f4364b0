use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::types::Config;
use crate::dependencies::ExecutionMode;

/// Environment variable that overrides `runtime.mode`.
pub const MODE_ENV_VAR: &str = "REDUCTO_MODE";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/reducto/config.toml` on Linux, or the equivalent
    /// on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("reducto").join("config.toml")
    }

    /// Loads configuration from the default config file, then applies
    /// the `REDUCTO_MODE` override.
    ///
    /// - If the file doesn't exist, starts from `Config::default()`.
    /// - Returns an error if reading, parsing, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Config::default()
        };
        config.apply_mode_override(std::env::var(MODE_ENV_VAR).ok().as_deref())?;
        Ok(config)
    }

    /// Loads and validates the configuration file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Replaces `runtime.mode` with `value` when one is given.
    pub fn apply_mode_override(&mut self, value: Option<&str>) -> Result<(), ConfigError> {
        let Some(value) = value else {
            return Ok(());
        };
        self.runtime.mode =
            ExecutionMode::parse(value).ok_or_else(|| ConfigError::ValidationError {
                message: format!(
                    "{MODE_ENV_VAR} must be one of live, preview, test (got '{value}')"
                ),
            })?;
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - The receive timeout is not zero
    /// - The logging filter is not empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.harness.receive_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "harness.receive_timeout_ms must be greater than zero".to_string(),
            });
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "logging.filter must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
