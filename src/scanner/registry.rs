//! Registry of in-flight scans.
//!
//! Maps scan ids to their progress tracker and cancellation token. An entry
//! exists exactly while its scan is running: it is inserted when the scan is
//! admitted and removed when the [`RegistrationGuard`] is dropped, on every
//! exit path.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tvshelf_common::{Error, Result, ScanId};

use super::progress::ProgressTracker;

#[derive(Clone)]
pub struct ActiveScan {
    pub tracker: Arc<ProgressTracker>,
    pub cancel: CancellationToken,
}

#[derive(Clone, Default)]
pub struct ScanRegistry {
    scans: Arc<DashMap<ScanId, ActiveScan>>,
    admission: Arc<Mutex<()>>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a scan. Only one scan may run at a time.
    pub fn register(
        &self,
        id: ScanId,
        tracker: Arc<ProgressTracker>,
        cancel: CancellationToken,
    ) -> Result<RegistrationGuard> {
        let _admission = self.admission.lock();
        if let Some(running) = self.scans.iter().next() {
            return Err(Error::conflict(format!(
                "scan {} is already running",
                running.key()
            )));
        }
        self.scans.insert(id, ActiveScan { tracker, cancel });
        Ok(RegistrationGuard {
            registry: self.clone(),
            id,
        })
    }

    pub fn get(&self, id: ScanId) -> Option<ActiveScan> {
        self.scans.get(&id).map(|e| e.value().clone())
    }

    pub fn tracker(&self, id: ScanId) -> Option<Arc<ProgressTracker>> {
        self.scans.get(&id).map(|e| e.tracker.clone())
    }

    /// Request cancellation. Returns `false` if no such scan is running.
    pub fn cancel(&self, id: ScanId) -> bool {
        match self.scans.get(&id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every running scan. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let mut n = 0;
        for entry in self.scans.iter() {
            entry.cancel.cancel();
            n += 1;
        }
        n
    }

    pub fn active_ids(&self) -> Vec<ScanId> {
        self.scans.iter().map(|e| *e.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    fn remove(&self, id: ScanId) {
        self.scans.remove(&id);
    }
}

/// Removes its scan from the registry when dropped.
pub struct RegistrationGuard {
    registry: ScanRegistry,
    id: ScanId,
}

impl RegistrationGuard {
    pub fn id(&self) -> ScanId {
        self.id
    }
}

impl std::fmt::Debug for RegistrationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationGuard").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
