//! Client configuration loading tests

use ssh_commons::{ClientConfig, Error, LogFormat};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_empty_toml_uses_defaults() {
    let config = ClientConfig::from_toml("").expect("empty config should parse");
    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.session_connect_timeout(), Duration::from_secs(5));
    assert_eq!(config.channel_connect_timeout(), Duration::from_secs(5));
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Text);
    assert!(config.logging.file.is_none());
}

#[test]
fn test_timeouts_are_independent() {
    let config = ClientConfig::from_toml("channel_connect_timeout_ms = 250\n")
        .expect("config should parse");
    assert_eq!(config.session_connect_timeout_ms, 5000);
    assert_eq!(config.channel_connect_timeout_ms, 250);
    assert!(config.validate().is_ok());
}

#[test]
fn test_logging_section() {
    let config = ClientConfig::from_toml(
        r#"
session_connect_timeout_ms = 10000

[logging]
level = "debug"
format = "json"
file = "/var/log/ssh-commons/transfer.json"
"#,
    )
    .expect("config should parse");

    assert_eq!(config.session_connect_timeout_ms, 10000);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(
        config.logging.file,
        Some(PathBuf::from("/var/log/ssh-commons/transfer.json"))
    );
}

#[test]
fn test_from_file() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "session_connect_timeout_ms = 750").expect("Failed to write config");

    let config = ClientConfig::from_file(file.path()).expect("config should load");
    assert_eq!(config.session_connect_timeout(), Duration::from_millis(750));
}

#[test]
fn test_missing_file_is_config_error() {
    let err = ClientConfig::from_file("/nonexistent/ssh-commons.toml").expect_err("should fail");
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().starts_with("Configuration error: Failed to read config file"));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let err = ClientConfig::from_toml("session_connect_timeout_ms = \"soon\"")
        .expect_err("should fail");
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_zero_session_timeout_rejected() {
    let config = ClientConfig::from_toml("session_connect_timeout_ms = 0").expect("config should parse");
    assert!(matches!(config.validate(), Err(Error::Config(_))));
}
