use serde::Deserialize;
use std::path::Path;

use dicom_codec::{CodecConfig, CodecOptions};

use crate::config::{ConfigError, LoggingConfig, ScanConfig};

/// Top-level configuration, loaded from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub codec: CodecConfig,
}

impl Config {
    /// Load and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a configuration string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;
        self.scan.validate()?;
        self.codec.validate().map_err(ConfigError::InvalidCodec)?;
        Ok(())
    }

    /// Runtime codec options for every decode started from this configuration
    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions::from_config(&self.codec)
    }
}
