//! Live scan progress.
//!
//! A [`ProgressTracker`] owns the current [`ScanProgress`] of one scan and
//! pushes a full snapshot to every subscriber on each mutation. New
//! subscribers receive the current snapshot first, taken under the same
//! lock that guards publishing, so no update is missed or seen twice.

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tvshelf_common::{ScanError, ScanId, ScanPhase, ScanType};
use tvshelf_db::models::ScanCounts;

/// Buffered snapshots per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Snapshot of a running scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanProgress {
    pub scan_id: ScanId,
    pub scan_type: ScanType,
    pub phase: ScanPhase,
    /// Files the current phase has to work through. Grows while discovering.
    pub total_files: u64,
    /// Files the current phase has finished. Reset on every phase change.
    pub processed_files: u64,
    pub current_file: Option<String>,
    pub files_scanned: u64,
    pub files_added: u64,
    pub files_updated: u64,
    pub files_unchanged: u64,
    pub files_deleted: u64,
    pub errors: Vec<ScanError>,
}

impl ScanProgress {
    fn new(scan_id: ScanId, scan_type: ScanType) -> Self {
        Self {
            scan_id,
            scan_type,
            phase: ScanPhase::Discovering,
            total_files: 0,
            processed_files: 0,
            current_file: None,
            files_scanned: 0,
            files_added: 0,
            files_updated: 0,
            files_unchanged: 0,
            files_deleted: 0,
            errors: Vec::new(),
        }
    }

    /// Counters persisted on the history row.
    pub fn counts(&self) -> ScanCounts {
        ScanCounts {
            files_scanned: self.files_scanned,
            files_added: self.files_added,
            files_updated: self.files_updated,
            files_deleted: self.files_deleted,
        }
    }
}

/// Initial snapshot plus the stream of later ones.
pub struct ProgressSubscription {
    pub initial: ScanProgress,
    pub updates: broadcast::Receiver<ScanProgress>,
}

pub struct ProgressTracker {
    state: RwLock<ScanProgress>,
    tx: broadcast::Sender<ScanProgress>,
}

impl ProgressTracker {
    pub fn new(scan_id: ScanId, scan_type: ScanType) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(ScanProgress::new(scan_id, scan_type)),
            tx,
        }
    }

    pub fn snapshot(&self) -> ScanProgress {
        self.state.read().clone()
    }

    pub fn subscribe(&self) -> ProgressSubscription {
        let state = self.state.read();
        ProgressSubscription {
            initial: state.clone(),
            updates: self.tx.subscribe(),
        }
    }

    /// Apply `f` and publish the result.
    pub fn update(&self, f: impl FnOnce(&mut ScanProgress)) {
        let mut state = self.state.write();
        f(&mut state);
        // No receivers is fine.
        let _ = self.tx.send(state.clone());
    }

    /// Enter `phase`, resetting the per-phase counters.
    pub fn set_phase(&self, phase: ScanPhase, total_files: u64) {
        self.update(|p| {
            p.phase = phase;
            p.total_files = total_files;
            p.processed_files = 0;
            p.current_file = None;
        });
    }

    pub fn phase(&self) -> ScanPhase {
        self.state.read().phase
    }

    pub fn record_error(&self, error: ScanError) {
        self.update(|p| p.errors.push(error));
    }
}
