//! Bounded-concurrency DICOM directory scanning
//!
//! Walks a directory tree, decodes every file with [`dicom_codec`] on a
//! fixed-size worker pool and reports one outcome per file.

pub mod config;
pub mod logging;
pub mod scan;

pub use dicom_codec as codec;

pub use config::{Config, ConfigError};
pub use logging::init_logging;
pub use scan::{walk_directory, DirectoryParser, FileOutcome, ScanError, ScanSummary};
