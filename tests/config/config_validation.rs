use dicom_scan::config::{Config, ConfigError, LoggingConfig};
use dicom_scan::init_logging;
use tempfile::TempDir;

fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml).expect("TOML parse error");
    config.validate()?;
    Ok(config)
}

#[test]
fn test_basic_config() {
    let toml = r#"
        [logging]
        level = "warn"

        [scan]
        workers = 16
        file_timeout_ms = 30000
    "#;

    let config = load_config_from_str(toml).expect("valid config");
    assert_eq!(config.scan.workers, 16);
    assert_eq!(config.scan.file_timeout_ms, Some(30000));
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_invalid_sections_fail_validation() {
    let cases = [
        "[scan]\nworkers = 0\n",
        "[scan]\nfile_timeout_ms = 0\n",
        "[codec]\nmax_nesting_depth = 0\n",
        "[logging]\nlevel = \"verbose\"\n",
    ];
    for toml in cases {
        assert!(load_config_from_str(toml).is_err(), "{:?} should be rejected", toml);
    }
}

#[test]
fn test_unknown_dictionary_is_a_parse_error() {
    let result = Config::from_toml_str("[codec]\ndictionary = \"full\"\n");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("scan.toml");
    std::fs::write(&path, "[scan]\nworkers = 3\nfollow_links = true\n").unwrap();

    let config = Config::from_file(&path).expect("load config");
    assert_eq!(config.scan.workers, 3);
    assert!(config.scan.follow_links);

    let missing = Config::from_file(temp_dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(ConfigError::Read { .. })));
}

#[test]
fn test_logging_initializes_once() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("scan.log");
    let logging = LoggingConfig {
        level: "debug".to_string(),
        log_to_file: true,
        log_file_path: log_path.display().to_string(),
    };

    init_logging(&logging).expect("first init succeeds");
    assert!(log_path.exists());

    let second = init_logging(&LoggingConfig::default());
    assert!(matches!(second, Err(ConfigError::LoggingInit(_))));
}
