//! Tracing subscriber bootstrap

use std::fs::File;
use std::sync::Mutex;

use tracing_subscriber::{self, prelude::*, EnvFilter};

use crate::config::{ConfigError, LoggingConfig};

/// Install the global subscriber: stdout, plus a file when configured.
///
/// `RUST_LOG` overrides the configured level. Calling this twice returns
/// `ConfigError::LoggingInit` instead of panicking.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    if config.log_to_file {
        let file = File::create(&config.log_file_path).map_err(|source| ConfigError::LogFile {
            path: config.log_file_path.clone(),
            source,
        })?;
        let file_appender = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(filter());

        tracing_subscriber::registry()
            .with(file_appender)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(filter()),
            )
            .try_init()
            .map_err(|e| ConfigError::LoggingInit(e.to_string()))
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(filter()),
            )
            .try_init()
            .map_err(|e| ConfigError::LoggingInit(e.to_string()))
    }
}
