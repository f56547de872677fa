use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use dicom_codec::{CodecOptions, DicomDocument};

use crate::config::Config;
use crate::scan::{FileOutcome, ScanError, ScanSummary};

/// Decodes many files at once with at most `workers` files open at a time.
///
/// Each file is decoded independently; one failure never stops the others.
/// Results reach the caller through a channel drained by a single
/// aggregator, which is the only place counts are updated.
#[derive(Debug, Clone)]
pub struct DirectoryParser {
    workers: usize,
    job: Arc<ParseJob>,
}

#[derive(Debug)]
struct ParseJob {
    options: CodecOptions,
    timeout: Option<Duration>,
    max_file_size: Option<u64>,
}

impl DirectoryParser {
    pub fn new(workers: usize, options: CodecOptions) -> Self {
        Self {
            workers: workers.max(1),
            job: Arc::new(ParseJob {
                options,
                timeout: None,
                max_file_size: None,
            }),
        }
    }

    /// A configured `max_file_size` also caps how far a deflated file may
    /// inflate, so it bounds memory per worker.
    pub fn from_config(config: &Config) -> Self {
        let mut options = config.codec_options();
        if let Some(limit) = config.scan.max_file_size {
            options.max_inflated_size = options.max_inflated_size.min(limit);
        }
        Self::new(config.scan.workers, options)
            .with_timeout(config.scan.file_timeout())
            .with_max_file_size(config.scan.max_file_size)
    }

    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        self.map_job(|job| job.timeout = timeout)
    }

    pub fn with_max_file_size(self, max_file_size: Option<u64>) -> Self {
        self.map_job(|job| job.max_file_size = max_file_size)
    }

    fn map_job(mut self, update: impl FnOnce(&mut ParseJob)) -> Self {
        let mut job = ParseJob {
            options: self.job.options.clone(),
            timeout: self.job.timeout,
            max_file_size: self.job.max_file_size,
        };
        update(&mut job);
        self.job = Arc::new(job);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Decode a fixed list of paths
    pub async fn parse_paths<F>(&self, paths: Vec<PathBuf>, callback: F) -> ScanSummary
    where
        F: FnMut(FileOutcome),
    {
        let (tx, rx) = mpsc::channel(paths.len().max(1));
        for path in paths {
            // capacity covers every path, so this never waits
            if tx.send(path).await.is_err() {
                break;
            }
        }
        drop(tx);
        self.parse_stream(rx, callback).await
    }

    /// Decode paths as they arrive until the sender side closes, then wait
    /// for every dispatched file before returning.
    pub async fn parse_stream<F>(
        &self,
        mut paths: mpsc::Receiver<PathBuf>,
        mut callback: F,
    ) -> ScanSummary
    where
        F: FnMut(FileOutcome),
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let (tx, mut rx) = mpsc::channel::<FileOutcome>(self.workers);
        let job = self.job.clone();

        let dispatcher = tokio::spawn(async move {
            let mut dispatched = 0usize;
            while let Some(path) = paths.recv().await {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let tx = tx.clone();
                let job = job.clone();
                tokio::spawn(async move {
                    // released once the outcome is handed over and the
                    // blocking decode has ended, whichever comes last
                    let permit = Arc::new(permit);
                    let outcome = job.run(path, permit.clone()).await;
                    let _ = tx.send(outcome).await;
                    drop(permit);
                });
                dispatched += 1;
            }
            dispatched
        });

        let mut summary = ScanSummary::default();
        while let Some(outcome) = rx.recv().await {
            summary.record(&outcome);
            callback(outcome);
        }

        match dispatcher.await {
            Ok(dispatched) if dispatched != summary.total => warn!(
                "Dispatched {} files but received {} results",
                dispatched, summary.total
            ),
            Ok(_) => {}
            Err(e) => warn!("Dispatcher task failed: {}", e),
        }
        info!(
            "Scan finished: {} files, {} parsed, {} skipped, {} failed",
            summary.total, summary.parsed, summary.skipped, summary.failed
        );
        summary
    }
}

impl ParseJob {
    async fn run(&self, path: PathBuf, permit: Arc<OwnedSemaphorePermit>) -> FileOutcome {
        match self.parse(&path, permit).await {
            Ok(document) => {
                debug!("Parsed {}", path.display());
                FileOutcome::Parsed {
                    path,
                    document: Box::new(document),
                }
            }
            Err(ScanError::Decode(err)) if err.is_recoverable() => {
                debug!("Skipping {}: {}", path.display(), err);
                FileOutcome::Skipped {
                    path,
                    reason: err.to_string(),
                }
            }
            Err(error) => {
                warn!("Failed to parse {}: {}", path.display(), error);
                FileOutcome::Failed { path, error }
            }
        }
    }

    /// Read and decode on one blocking thread. The permit travels with the
    /// file buffer, so a timed-out decode keeps its worker slot until it ends.
    async fn parse(
        &self,
        path: &Path,
        permit: Arc<OwnedSemaphorePermit>,
    ) -> Result<DicomDocument, ScanError> {
        if let Some(limit) = self.max_file_size {
            let size = tokio::fs::metadata(path).await?.len();
            if size > limit {
                return Err(ScanError::TooLarge { size, limit });
            }
        }

        let options = self.options.clone();
        let source = path.to_path_buf();
        let decode = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let data = std::fs::read(&source)?;
            let mut document = DicomDocument::from_bytes(&data, &options)?;
            document.path = Some(source);
            Ok::<_, ScanError>(document)
        });
        let joined = async { decode.await.map_err(|e| ScanError::Worker(e.to_string()))? };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, joined)
                .await
                .map_err(|_| ScanError::Timeout(limit))?,
            None => joined.await,
        }
    }
}
