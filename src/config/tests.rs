#![cfg(test)]

use std::time::Duration;

use crate::config::{Config, ConfigError};
use dicom_codec::DictionaryKind;

#[test]
fn test_full_config() {
    let toml = r#"
        [logging]
        level = "debug"
        log_to_file = true
        log_file_path = "/tmp/dicom-scan.log"

        [scan]
        workers = 4
        file_timeout_ms = 2500
        follow_links = true
        max_file_size = 1048576

        [codec]
        strict_vr = true
        max_nesting_depth = 64
        dictionary = "minimal"
    "#;

    let config = Config::from_toml_str(toml).expect("config should parse and validate");

    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.log_to_file);
    assert_eq!(config.scan.workers, 4);
    assert_eq!(config.scan.file_timeout(), Some(Duration::from_millis(2500)));
    assert!(config.scan.follow_links);
    assert_eq!(config.scan.max_file_size, Some(1_048_576));
    assert!(config.codec.strict_vr);
    assert!(!config.codec.strict_transfer_syntax);
    assert_eq!(config.codec.max_nesting_depth, 64);
    assert_eq!(config.codec.dictionary, DictionaryKind::Minimal);

    let options = config.codec_options();
    assert!(options.strict_vr);
    assert_eq!(options.max_nesting_depth, 64);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = Config::from_toml_str("").expect("empty config is valid");
    assert_eq!(config.logging.level, "info");
    assert!(!config.logging.log_to_file);
    assert_eq!(config.scan.workers, 8);
    assert_eq!(config.scan.file_timeout(), None);
    assert!(!config.scan.follow_links);
    assert_eq!(config.codec.max_nesting_depth, 1024);
}

#[test]
fn test_zero_workers_rejected() {
    let toml = r#"
        [scan]
        workers = 0
    "#;
    assert!(matches!(
        Config::from_toml_str(toml),
        Err(ConfigError::InvalidScan(_))
    ));
}

#[test]
fn test_zero_depth_rejected() {
    let toml = r#"
        [codec]
        max_nesting_depth = 0
    "#;
    assert!(matches!(
        Config::from_toml_str(toml),
        Err(ConfigError::InvalidCodec(_))
    ));
}

#[test]
fn test_bad_level_and_missing_log_path() {
    let toml = r#"
        [logging]
        level = "loud"
    "#;
    assert!(matches!(
        Config::from_toml_str(toml),
        Err(ConfigError::InvalidLogLevel(level)) if level == "loud"
    ));

    let toml = r#"
        [logging]
        log_to_file = true
    "#;
    assert!(matches!(
        Config::from_toml_str(toml),
        Err(ConfigError::MissingLogFilePath)
    ));
}

#[test]
fn test_malformed_toml() {
    assert!(matches!(
        Config::from_toml_str("[scan\nworkers = 2"),
        Err(ConfigError::Parse(_))
    ));
}
