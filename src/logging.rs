//! Global `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
///
/// Panics if a global subscriber is already set; see [`try_init_tracing`].
pub fn init_tracing(config: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

/// Like [`init_tracing`], but returns an error instead of panicking when a
/// global subscriber is already installed.
pub fn try_init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .try_init()
}
