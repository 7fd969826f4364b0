use std::fs;

use reducto::config::{Config, ConfigError, HarnessConfig, LoggingConfig, RuntimeConfig};
use reducto::logging::try_init_tracing;
use reducto::ExecutionMode;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn defaults_are_live_with_one_second_timeout() {
    let config = Config::default();
    assert_eq!(config.runtime.mode, ExecutionMode::Live);
    assert_eq!(config.harness.receive_timeout_ms, 1000);
    assert_eq!(config.logging.filter, "info");
    assert!(config.validate().is_ok());
}

#[test]
fn config_path_ends_with_reducto_config() {
    let path = Config::config_path();
    assert!(path.ends_with("reducto/config.toml"), "{}", path.display());
}

#[test]
fn load_from_reads_every_section() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[runtime]
mode = "preview"

[harness]
receive_timeout_ms = 250

[logging]
filter = "reducto=debug"
"#,
    );

    let config = Config::load_from(&path).unwrap();
    assert_eq!(
        config,
        Config {
            runtime: RuntimeConfig {
                mode: ExecutionMode::Preview,
            },
            harness: HarnessConfig {
                receive_timeout_ms: 250,
            },
            logging: LoggingConfig {
                filter: "reducto=debug".to_string(),
            },
        }
    );
    assert_eq!(config.harness.receive_timeout().as_millis(), 250);
}

#[test]
fn missing_sections_use_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[runtime]\nmode = \"test\"\n");

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.runtime.mode, ExecutionMode::Test);
    assert_eq!(config.harness, HarnessConfig::default());
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let result = Config::load_from(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::ReadError { .. })));
}

#[test]
fn unknown_mode_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[runtime]\nmode = \"staging\"\n");
    assert!(matches!(
        Config::load_from(&path),
        Err(ConfigError::ParseError { .. })
    ));
}

#[test]
fn zero_timeout_fails_validation() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[harness]\nreceive_timeout_ms = 0\n");
    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));
    assert!(err.to_string().contains("receive_timeout_ms"));
}

#[test]
fn blank_filter_fails_validation() {
    let config = Config {
        logging: LoggingConfig {
            filter: "  ".to_string(),
        },
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError { .. })
    ));
}

#[test]
fn mode_override_replaces_the_file_value() {
    let mut config = Config::default();
    config.apply_mode_override(None).unwrap();
    assert_eq!(config.runtime.mode, ExecutionMode::Live);

    config.apply_mode_override(Some("Test")).unwrap();
    assert_eq!(config.runtime.mode, ExecutionMode::Test);

    let err = config.apply_mode_override(Some("staging")).unwrap_err();
    assert!(err.to_string().contains("staging"));
    assert_eq!(config.runtime.mode, ExecutionMode::Test);
}

#[test]
fn tracing_can_only_be_installed_once() {
    let config = LoggingConfig::default();
    assert!(try_init_tracing(&config).is_ok());
    assert!(try_init_tracing(&config).is_err());
}
