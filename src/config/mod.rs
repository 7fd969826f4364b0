//! Runtime configuration loaded from TOML.

mod loader;
mod types;

pub use loader::{ConfigError, MODE_ENV_VAR};
pub use types::{Config, HarnessConfig, LoggingConfig, RuntimeConfig};
