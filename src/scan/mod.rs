//! Concurrent decoding of every file under a directory

mod parser;
mod walker;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use dicom_codec::{DicomDocument, DicomError};

use crate::config::Config;

pub use parser::DirectoryParser;
pub use walker::spawn_walker;

/// Why a single file could not be parsed
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DicomError),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("File is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("Worker failed: {0}")]
    Worker(String),
}

/// Result for one file, delivered to the per-file callback
#[derive(Debug)]
pub enum FileOutcome {
    Parsed {
        path: PathBuf,
        document: Box<DicomDocument>,
    },
    /// Not a DICOM file; callers normally ignore these
    Skipped { path: PathBuf, reason: String },
    Failed { path: PathBuf, error: ScanError },
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Parsed { path, .. }
            | FileOutcome::Skipped { path, .. }
            | FileOutcome::Failed { path, .. } => path,
        }
    }
}

/// One failed file in a summary
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Aggregated counts; `total == parsed + skipped + failed`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub parsed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FileFailure>,
}

impl ScanSummary {
    pub(crate) fn record(&mut self, outcome: &FileOutcome) {
        self.total += 1;
        match outcome {
            FileOutcome::Parsed { .. } => self.parsed += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { path, error } => {
                self.failed += 1;
                self.failures.push(FileFailure {
                    path: path.clone(),
                    error: error.to_string(),
                });
            }
        }
    }
}

/// Decode every regular file below `root`, calling `callback` once per file
/// as results arrive. Returns when every file has been reported.
pub async fn walk_directory<F>(
    root: impl AsRef<Path>,
    config: &Config,
    callback: F,
) -> Result<ScanSummary, ScanError>
where
    F: FnMut(FileOutcome),
{
    let root = root.as_ref().to_path_buf();
    // surface a missing root as an error rather than an empty scan
    tokio::fs::metadata(&root).await?;

    let parser = DirectoryParser::from_config(config);
    let (paths, walker) = spawn_walker(root, config.scan.follow_links, config.scan.workers);
    let summary = parser.parse_stream(paths, callback).await;
    walker
        .await
        .map_err(|e| ScanError::Worker(e.to_string()))?;
    Ok(summary)
}
