//! Configuration for decoding and encoding

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dictionary::{Dictionary, MinimalDictionary, StandardDictionary};
use crate::error::{DicomError, Result};
use crate::{DEFAULT_MAX_INFLATED_SIZE, DEFAULT_MAX_NESTING_DEPTH};

/// Which built-in dictionary resolves implicit VRs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictionaryKind {
    #[default]
    Standard,
    Minimal,
}

/// Serializable codec settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Reject unknown explicit VR codes instead of reading them as UN
    #[serde(default)]
    pub strict_vr: bool,

    /// Reject unknown transfer syntax UIDs instead of assuming explicit VR little endian
    #[serde(default)]
    pub strict_transfer_syntax: bool,

    /// Maximum number of nested sequences
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,

    /// Dictionary for implicit VR lookup and element names
    #[serde(default)]
    pub dictionary: DictionaryKind,

    /// Largest deflated data set, in inflated bytes, that will be decoded
    #[serde(default = "default_max_inflated_size")]
    pub max_inflated_size: u64,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            strict_vr: false,
            strict_transfer_syntax: false,
            max_nesting_depth: default_max_nesting_depth(),
            dictionary: DictionaryKind::default(),
            max_inflated_size: default_max_inflated_size(),
        }
    }
}

impl CodecConfig {
    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_nesting_depth == 0 {
            return Err("max_nesting_depth must be greater than 0".to_string());
        }
        if self.max_inflated_size == 0 {
            return Err("max_inflated_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn default_max_nesting_depth() -> usize {
    DEFAULT_MAX_NESTING_DEPTH
}

fn default_max_inflated_size() -> u64 {
    DEFAULT_MAX_INFLATED_SIZE
}

/// Runtime options handed to every decode and encode call
#[derive(Clone)]
pub struct CodecOptions {
    pub strict_vr: bool,
    pub strict_transfer_syntax: bool,
    pub max_nesting_depth: usize,
    pub max_inflated_size: u64,
    pub dictionary: Arc<dyn Dictionary>,
}

impl CodecOptions {
    pub fn from_config(config: &CodecConfig) -> Self {
        let dictionary: Arc<dyn Dictionary> = match config.dictionary {
            DictionaryKind::Standard => Arc::new(StandardDictionary),
            DictionaryKind::Minimal => Arc::new(MinimalDictionary),
        };
        Self {
            strict_vr: config.strict_vr,
            strict_transfer_syntax: config.strict_transfer_syntax,
            max_nesting_depth: config.max_nesting_depth,
            max_inflated_size: config.max_inflated_size,
            dictionary,
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict_vr = true;
        self.strict_transfer_syntax = true;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_max_inflated_size(mut self, limit: u64) -> Self {
        self.max_inflated_size = limit;
        self
    }

    pub fn with_dictionary(mut self, dictionary: Arc<dyn Dictionary>) -> Self {
        self.dictionary = dictionary;
        self
    }

    /// Guard used by both decoder and encoder when opening a sequence
    pub(crate) fn check_depth(&self, depth: usize, offset: u64) -> Result<()> {
        if depth > self.max_nesting_depth {
            return Err(DicomError::NestingTooDeep {
                offset,
                limit: self.max_nesting_depth,
            });
        }
        Ok(())
    }
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self::from_config(&CodecConfig::default())
    }
}

impl fmt::Debug for CodecOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecOptions")
            .field("strict_vr", &self.strict_vr)
            .field("strict_transfer_syntax", &self.strict_transfer_syntax)
            .field("max_nesting_depth", &self.max_nesting_depth)
            .field("max_inflated_size", &self.max_inflated_size)
            .finish_non_exhaustive()
    }
}
