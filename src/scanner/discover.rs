//! Path discovery.
//!
//! Walks the configured roots on a blocking thread and streams every media
//! file found. Each call performs an independent walk.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use tvshelf_common::paths::{is_hidden_name, is_media_file};
use tvshelf_db::models::millis_to_datetime;
use walkdir::WalkDir;

/// Files buffered between the walker thread and the scan.
const CHANNEL_CAPACITY: usize = 256;

/// A media file seen on disk during one walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub filepath: PathBuf,
    pub filename: String,
    pub file_size: u64,
    /// Millisecond precision, matching what the store keeps.
    pub date_modified: DateTime<Utc>,
}

impl DiscoveredFile {
    /// Lossy string form of the path, used as the file's unique key.
    pub fn path_key(&self) -> String {
        self.filepath.to_string_lossy().into_owned()
    }
}

/// Stream the media files under `roots`.
///
/// Symlinks are followed. Unreadable entries, broken links and loops are
/// logged and skipped. Hidden files and directories are not descended
/// into. Entries are yielded in file-name order within each directory.
/// Dropping the stream stops the walk.
pub fn discover(
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
) -> ReceiverStream<DiscoveredFile> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        for root in roots {
            let walker = WalkDir::new(&root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0 || !e.file_name().to_str().is_some_and(is_hidden_name)
                });

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };

                if !entry.file_type().is_file() || !is_media_file(entry.path(), &extensions) {
                    continue;
                }

                let metadata = match entry.metadata() {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(
                            file = %entry.path().display(),
                            error = %e,
                            "Skipping file without metadata"
                        );
                        continue;
                    }
                };
                let modified = metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_default();

                let file = DiscoveredFile {
                    filepath: entry.path().to_path_buf(),
                    filename: entry.file_name().to_string_lossy().into_owned(),
                    file_size: metadata.len(),
                    date_modified: millis_to_datetime(modified.timestamp_millis()),
                };

                if tx.blocking_send(file).is_err() {
                    debug!("Discovery receiver dropped, stopping walk");
                    return;
                }
            }
        }
    });

    ReceiverStream::new(rx)
}
