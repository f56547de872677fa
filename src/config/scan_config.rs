use serde::Deserialize;
use std::time::Duration;

use crate::config::ConfigError;

/// Settings for the concurrent directory parser
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Maximum number of files decoded at the same time
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-file decode timeout in milliseconds
    #[serde(default)]
    pub file_timeout_ms: Option<u64>,

    /// Follow symbolic links while walking
    #[serde(default)]
    pub follow_links: bool,

    /// Files larger than this many bytes are reported as failures without
    /// being read
    #[serde(default)]
    pub max_file_size: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            file_timeout_ms: None,
            follow_links: false,
            max_file_size: None,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidScan(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.file_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidScan(
                "file_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn file_timeout(&self) -> Option<Duration> {
        self.file_timeout_ms.map(Duration::from_millis)
    }
}

fn default_workers() -> usize {
    8
}
