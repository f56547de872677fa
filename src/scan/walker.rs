use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Walk `root` on a blocking thread, streaming every regular file into the
/// returned channel. The handle yields the number of paths sent.
pub fn spawn_walker(
    root: PathBuf,
    follow_links: bool,
    capacity: usize,
) -> (mpsc::Receiver<PathBuf>, JoinHandle<usize>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::task::spawn_blocking(move || {
        let mut sent = 0;
        let entries = WalkDir::new(&root)
            .follow_links(follow_links)
            .sort_by_file_name()
            .into_iter();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if tx.blocking_send(entry.into_path()).is_err() {
                // receiver dropped, nobody is listening
                break;
            }
            sent += 1;
        }
        debug!("Walked {}: {} files", root.display(), sent);
        sent
    });
    (rx, handle)
}
