//! TV library scanner.
//!
//! [`Scanner`] is the entry point: it admits scans, runs them on background
//! tasks and answers progress and history queries. A scan walks the
//! configured media paths, parses each episode filename, resolves it into
//! the show/season/episode hierarchy, reconciles the file record and finally
//! flags stored files that disappeared from disk.
//!
//! Only one scan runs at a time; a second request gets
//! [`Error::Conflict`](tvshelf_common::Error::Conflict).

pub mod cache;
pub mod checkpoint;
pub mod discover;
pub mod orchestrator;
pub mod probe;
pub mod progress;
pub mod reconcile;
pub mod registry;
pub mod resolver;

use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tvshelf_common::{Error, Result, ScanId, ScanType};
use tvshelf_db::models::ScanHistory;
use tvshelf_db::pool::{get_conn, DbPool};
use tvshelf_db::queries::scan_history;

use crate::config::Config;
use orchestrator::{ScanContext, ScanJob};
use registry::RegistrationGuard;

pub use checkpoint::CANCELLED_MESSAGE;
pub use orchestrator::UNPARSEABLE_MESSAGE;
pub use probe::{FfprobeProbe, MediaProbe};
pub use progress::{ProgressSubscription, ProgressTracker, ScanProgress};
pub use registry::ScanRegistry;

/// Per-scan overrides of the configured scanner settings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub scan_type: ScanType,
    pub skip_metadata: Option<bool>,
    /// Maximum concurrent probes.
    pub concurrency: Option<usize>,
}

impl ScanOptions {
    pub fn incremental() -> Self {
        Self {
            scan_type: ScanType::Incremental,
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct Scanner {
    ctx: ScanContext,
    registry: ScanRegistry,
}

impl Scanner {
    /// Scanner probing with `ffprobe` as configured under `[tools]`.
    pub fn new(pool: DbPool, config: Arc<Config>) -> Self {
        let probe = Arc::new(FfprobeProbe::new(config.tools.ffprobe_path.as_deref()));
        Self::with_probe(pool, config, probe)
    }

    pub fn with_probe(pool: DbPool, config: Arc<Config>, probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            ctx: ScanContext {
                pool,
                config,
                probe,
            },
            registry: ScanRegistry::new(),
        }
    }

    pub fn registry(&self) -> &ScanRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    /// Register the scan and create its RUNNING history row.
    fn admit(&self, options: ScanOptions) -> Result<(ScanJob, RegistrationGuard)> {
        let id = ScanId::new();
        let tracker = Arc::new(ProgressTracker::new(id, options.scan_type));
        let cancel = CancellationToken::new();
        let guard = self.registry.register(id, tracker.clone(), cancel.clone())?;

        let conn = get_conn(&self.ctx.pool)?;
        let row = scan_history::create_scan(&conn, id, options.scan_type)?;

        let settings = &self.ctx.config.scanner;
        let job = ScanJob {
            id,
            scan_type: options.scan_type,
            started_at: row.started_at,
            skip_metadata: options.skip_metadata.unwrap_or(settings.skip_metadata),
            probe_concurrency: options
                .concurrency
                .unwrap_or(settings.probe_concurrency)
                .max(1),
            tracker,
            cancel,
        };
        info!(scan_id = %id, scan_type = %job.scan_type, "Scan started");
        Ok((job, guard))
    }

    /// Start a scan in the background and return its id at once.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_scan(&self, options: ScanOptions) -> Result<ScanId> {
        let (job, guard) = self.admit(options)?;
        let id = job.id;
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            supervise(ctx, job, guard).await;
        });
        Ok(id)
    }

    /// Run a scan to completion on the current task.
    pub async fn scan(&self, options: ScanOptions) -> Result<ScanHistory> {
        let (job, guard) = self.admit(options)?;
        Ok(supervise(self.ctx.clone(), job, guard).await)
    }

    /// Request cancellation. `false` when the scan is not running.
    pub fn cancel_scan(&self, id: ScanId) -> bool {
        let found = self.registry.cancel(id);
        if found {
            info!(scan_id = %id, "Cancellation requested");
        }
        found
    }

    pub fn cancel_all(&self) -> usize {
        self.registry.cancel_all()
    }

    /// Live progress, `None` once the scan has finished.
    pub fn get_scan_progress(&self, id: ScanId) -> Option<ScanProgress> {
        self.registry.tracker(id).map(|t| t.snapshot())
    }

    pub fn subscribe(&self, id: ScanId) -> Option<ProgressSubscription> {
        self.registry.tracker(id).map(|t| t.subscribe())
    }

    pub fn active_scans(&self) -> Vec<ScanId> {
        self.registry.active_ids()
    }

    pub fn get_scan_history(&self, id: ScanId) -> Result<Option<ScanHistory>> {
        let conn = get_conn(&self.ctx.pool)?;
        scan_history::get_scan(&conn, id)
    }

    /// Most recent scans first.
    pub fn list_scan_history(&self, limit: u32) -> Result<Vec<ScanHistory>> {
        let conn = get_conn(&self.ctx.pool)?;
        scan_history::list_recent(&conn, limit)
    }
}

/// Run the pipeline on its own task so a panic still ends in a FAILED row,
/// then release the registry entry.
async fn supervise(ctx: ScanContext, job: ScanJob, guard: RegistrationGuard) -> ScanHistory {
    let outcome = match tokio::spawn(orchestrator::run_scan(ctx.clone(), job.clone())).await {
        Ok(result) => result,
        Err(e) => {
            error!(scan_id = %job.id, error = %e, "Scan task aborted");
            Err(Error::internal(format!("Scan task aborted: {}", e)))
        }
    };
    let history = orchestrator::finalize(&ctx.pool, &job, outcome);
    drop(guard);
    history
}
