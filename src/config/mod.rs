mod tests;
mod logging_config;
mod scan_config;
pub mod config;

use thiserror::Error;

pub use config::Config;
pub use logging_config::LoggingConfig;
pub use scan_config::ScanConfig;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("Log file path must be set when log_to_file is enabled")]
    MissingLogFilePath,

    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Logging already initialized: {0}")]
    LoggingInit(String),

    #[error("Invalid scan configuration: {0}")]
    InvalidScan(String),

    #[error("Invalid codec configuration: {0}")]
    InvalidCodec(String),
}
