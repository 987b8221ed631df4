//! Scan pipeline: validate, discover, parse, save, clean up, finalize.
//!
//! Only path validation failures, cancellation and storage failures outside
//! a batch end a scan early. Per-file parse failures and failed batches are
//! recorded as [`ScanError`]s and the scan carries on.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tvshelf_common::{Error, Result, ScanError, ScanId, ScanPhase, ScanStatus, ScanType};
use tvshelf_db::models::{MediaDetails, ScanHistory};
use tvshelf_db::pool::{get_conn, DbPool};
use tvshelf_db::queries::scan_history;
use tvshelf_parser::ParsedFilename;

use super::cache::HierarchyCache;
use super::checkpoint::{Checkpoint, CANCELLED_MESSAGE};
use super::discover::{discover, DiscoveredFile};
use super::probe::MediaProbe;
use super::progress::ProgressTracker;
use super::reconcile::{mark_missing_as_deleted, needs_refresh, upsert_file, FileOutcome};
use super::resolver::resolve;
use crate::config::{Config, MatchPolicy};

/// Recorded for files no naming convention recognizes.
pub const UNPARSEABLE_MESSAGE: &str = "Filename does not match any known naming convention";

/// Shared dependencies of every scan.
#[derive(Clone)]
pub(crate) struct ScanContext {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub probe: Arc<dyn MediaProbe>,
}

/// One admitted scan.
#[derive(Clone)]
pub(crate) struct ScanJob {
    pub id: ScanId,
    pub scan_type: ScanType,
    pub started_at: DateTime<Utc>,
    pub skip_metadata: bool,
    pub probe_concurrency: usize,
    pub tracker: Arc<ProgressTracker>,
    pub cancel: CancellationToken,
}

type ParsedBatch = [(DiscoveredFile, ParsedFilename)];

fn enter_phase(job: &ScanJob, phase: ScanPhase, total: u64) {
    info!(scan_id = %job.id, phase = %phase, total, "Entering phase");
    job.tracker.set_phase(phase, total);
}

pub(crate) async fn run_scan(ctx: ScanContext, job: ScanJob) -> Result<()> {
    let mut checkpoint = Checkpoint::new(
        job.cancel.clone(),
        ctx.config.scanner.yield_interval,
    );

    validate(&ctx, &job)?;
    checkpoint.check()?;

    let mut cache = {
        let conn = get_conn(&ctx.pool)?;
        HierarchyCache::load(&conn)?
    };

    let (discovered, seen) = discover_phase(&ctx, &job, &mut checkpoint).await?;

    let parsed = parse_phase(&job, &cache, discovered, &mut checkpoint).await?;
    save_phase(&ctx, &job, &mut cache, parsed, &mut checkpoint).await?;
    cleanup_phase(&ctx, &job, &mut cache, &seen, &checkpoint)?;
    Ok(())
}

fn validate(ctx: &ScanContext, job: &ScanJob) -> Result<()> {
    let paths = &ctx.config.library.media_paths;
    if paths.is_empty() {
        return Err(Error::invalid_input("No media paths configured"));
    }
    for path in paths {
        if !path.is_dir() {
            return Err(Error::invalid_input(format!(
                "Media path does not exist or is not a directory: {}",
                path.display()
            )));
        }
        std::fs::read_dir(path).map_err(|e| {
            Error::invalid_input(format!(
                "Media path is not readable: {}: {}",
                path.display(),
                e
            ))
        })?;
    }

    if !job.skip_metadata && !ctx.probe.is_available() {
        return Err(Error::tool(
            ctx.probe.name(),
            "not available; install it or enable scanner.skip_metadata",
        ));
    }
    Ok(())
}

async fn discover_phase(
    ctx: &ScanContext,
    job: &ScanJob,
    checkpoint: &mut Checkpoint,
) -> Result<(Vec<DiscoveredFile>, HashSet<String>)> {
    enter_phase(job, ScanPhase::Discovering, 0);

    let mut stream = discover(
        ctx.config.library.media_paths.clone(),
        ctx.config.library.extensions.clone(),
    );
    let mut files = Vec::new();
    let mut seen = HashSet::new();
    while let Some(file) = stream.next().await {
        checkpoint.tick().await?;
        let path = file.path_key();
        // Overlapping roots yield the same file more than once.
        if !seen.insert(path.clone()) {
            continue;
        }
        job.tracker.update(|p| {
            p.total_files += 1;
            p.processed_files += 1;
            p.current_file = Some(path);
        });
        files.push(file);
    }

    info!(scan_id = %job.id, files = files.len(), "Discovery finished");
    Ok((files, seen))
}

async fn parse_phase(
    job: &ScanJob,
    cache: &HierarchyCache,
    files: Vec<DiscoveredFile>,
    checkpoint: &mut Checkpoint,
) -> Result<Vec<(DiscoveredFile, ParsedFilename)>> {
    enter_phase(job, ScanPhase::Parsing, files.len() as u64);

    let mut parsed = Vec::with_capacity(files.len());
    for file in files {
        checkpoint.tick().await?;
        let path = file.path_key();

        if job.scan_type == ScanType::Incremental && !needs_refresh(cache, &file) {
            job.tracker.update(|p| {
                p.processed_files += 1;
                p.current_file = Some(path);
                p.files_scanned += 1;
                p.files_unchanged += 1;
            });
            continue;
        }

        match tvshelf_parser::parse(&file.filepath) {
            Some(result) => {
                job.tracker.update(|p| {
                    p.processed_files += 1;
                    p.current_file = Some(path);
                });
                parsed.push((file, result));
            }
            None => {
                warn!(scan_id = %job.id, file = %path, "Unrecognized filename");
                job.tracker.update(|p| {
                    p.processed_files += 1;
                    p.files_scanned += 1;
                    p.errors.push(ScanError::for_file(
                        ScanPhase::Parsing,
                        path.clone(),
                        UNPARSEABLE_MESSAGE,
                    ));
                    p.current_file = Some(path);
                });
            }
        }
    }
    Ok(parsed)
}

async fn save_phase(
    ctx: &ScanContext,
    job: &ScanJob,
    cache: &mut HierarchyCache,
    parsed: Vec<(DiscoveredFile, ParsedFilename)>,
    checkpoint: &mut Checkpoint,
) -> Result<()> {
    enter_phase(job, ScanPhase::Saving, parsed.len() as u64);

    let batch_size = ctx.config.scanner.batch_size.max(1);
    let policy = ctx.config.scanner.matching;
    let probe_timeout = Duration::from_secs(ctx.config.scanner.probe_timeout_secs.max(1));

    for batch in parsed.chunks(batch_size) {
        checkpoint.check()?;

        let details = if job.skip_metadata {
            HashMap::new()
        } else {
            probe_batch(
                ctx.probe.clone(),
                batch,
                cache,
                job.probe_concurrency,
                probe_timeout,
                &job.cancel,
            )
            .await?
        };
        checkpoint.check()?;

        let n = batch.len() as u64;
        let last = batch.last().map(|(f, _)| f.path_key());

        match save_batch(&ctx.pool, cache, batch, &details, &policy) {
            Ok(outcomes) => job.tracker.update(|p| {
                for outcome in &outcomes {
                    match outcome {
                        FileOutcome::Created => p.files_added += 1,
                        FileOutcome::Updated => p.files_updated += 1,
                        FileOutcome::Unchanged => p.files_unchanged += 1,
                    }
                }
                p.files_scanned += n;
                p.processed_files += n;
                p.current_file = last;
            }),
            Err(e) => {
                warn!(
                    scan_id = %job.id,
                    files = n,
                    error = %e,
                    "Batch failed and was rolled back"
                );
                let message = format!("Failed to save batch: {}", e);
                job.tracker.update(|p| {
                    p.errors.extend(batch.iter().map(|(f, _)| {
                        ScanError::for_file(ScanPhase::Saving, f.path_key(), message.clone())
                    }));
                    p.files_scanned += n;
                    p.processed_files += n;
                    p.current_file = last;
                });
            }
        }

        checkpoint.yield_now().await?;
    }
    Ok(())
}

/// Resolve and upsert one batch in a single transaction.
///
/// On failure the transaction rolls back and the cache forgets everything
/// the batch added.
fn save_batch(
    pool: &DbPool,
    cache: &mut HierarchyCache,
    batch: &ParsedBatch,
    details: &HashMap<String, MediaDetails>,
    policy: &MatchPolicy,
) -> Result<Vec<FileOutcome>> {
    let conn = get_conn(pool)?;
    cache.begin_batch();

    let result: Result<Vec<FileOutcome>> = (|| {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;
        let mut outcomes = Vec::with_capacity(batch.len());
        for (file, parsed) in batch {
            let resolved = resolve(&tx, cache, parsed, policy)?;
            let outcome = upsert_file(
                &tx,
                cache,
                resolved.episode_id,
                file,
                details.get(&file.path_key()),
            )?;
            outcomes.push(outcome);
        }
        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        Ok(outcomes)
    })();

    match result {
        Ok(outcomes) => {
            cache.commit_batch();
            Ok(outcomes)
        }
        Err(e) => {
            cache.rollback_batch();
            Err(e)
        }
    }
}

/// Probe the new or changed files of a batch, at most `concurrency` at a
/// time. A failed or timed-out probe only costs that file its details.
/// Cancellation aborts every outstanding probe.
async fn probe_batch(
    probe: Arc<dyn MediaProbe>,
    batch: &ParsedBatch,
    cache: &HierarchyCache,
    concurrency: usize,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<HashMap<String, MediaDetails>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (file, _) in batch.iter().filter(|(f, _)| needs_refresh(cache, f)) {
        let sem = semaphore.clone();
        let probe = probe.clone();
        let path = file.filepath.clone();
        let key = file.path_key();

        tasks.spawn(async move {
            let _permit = sem.acquire_owned().await;
            let result = match tokio::time::timeout(timeout, probe.probe(&path)).await {
                Ok(result) => result,
                Err(_) => Err(Error::tool(
                    probe.name(),
                    format!("timed out after {}s", timeout.as_secs()),
                )),
            };
            (key, result)
        });
    }

    let mut details = HashMap::new();
    loop {
        let joined = tokio::select! {
            _ = cancel.cancelled() => {
                tasks.abort_all();
                return Err(Error::cancelled(CANCELLED_MESSAGE));
            }
            joined = tasks.join_next() => joined,
        };
        match joined {
            None => break,
            Some(Ok((key, Ok(d)))) => {
                details.insert(key, d);
            }
            Some(Ok((key, Err(e)))) => {
                warn!(file = %key, error = %e, "Probe failed, saving without media details");
            }
            Some(Err(e)) => warn!(error = %e, "Probe task panicked"),
        }
    }
    Ok(details)
}

fn cleanup_phase(
    ctx: &ScanContext,
    job: &ScanJob,
    cache: &mut HierarchyCache,
    seen: &HashSet<String>,
    checkpoint: &Checkpoint,
) -> Result<()> {
    enter_phase(job, ScanPhase::Cleanup, 0);
    checkpoint.check()?;

    let result =
        get_conn(&ctx.pool).and_then(|conn| mark_missing_as_deleted(&conn, cache, seen));
    match result {
        Ok(flagged) => {
            if flagged > 0 {
                info!(scan_id = %job.id, files = flagged, "Flagged missing files");
            }
            job.tracker.update(|p| p.files_deleted = flagged);
        }
        Err(e) => {
            warn!(scan_id = %job.id, error = %e, "Failed to flag missing files");
            job.tracker.record_error(ScanError::fatal(
                ScanPhase::Cleanup,
                format!("Failed to flag missing files: {}", e),
            ));
        }
    }
    Ok(())
}

/// Persist the outcome of a scan and publish its terminal phase.
pub(crate) fn finalize(pool: &DbPool, job: &ScanJob, outcome: Result<()>) -> ScanHistory {
    let (status, phase) = match &outcome {
        Ok(()) => (ScanStatus::Completed, ScanPhase::Complete),
        Err(e) if e.is_cancelled() => (ScanStatus::Failed, ScanPhase::Cancelled),
        Err(_) => (ScanStatus::Failed, ScanPhase::Failed),
    };

    match &outcome {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => info!(scan_id = %job.id, "Scan cancelled"),
        Err(e) => error!(scan_id = %job.id, error = %e, "Scan failed"),
    }
    if let Err(e) = outcome {
        let at = job.tracker.phase();
        job.tracker.record_error(ScanError::fatal(at, e.to_string()));
    }

    let snapshot = job.tracker.snapshot();
    let counts = snapshot.counts();

    let stored = get_conn(pool).and_then(|conn| {
        scan_history::finish_scan(&conn, job.id, status, &counts, &snapshot.errors)?;
        scan_history::get_scan(&conn, job.id)
    });
    let history = match stored {
        Ok(Some(history)) => history,
        other => {
            if let Err(e) = other {
                error!(scan_id = %job.id, error = %e, "Failed to persist scan result");
            }
            ScanHistory {
                id: job.id,
                scan_type: job.scan_type,
                status,
                started_at: job.started_at,
                completed_at: Some(Utc::now()),
                files_scanned: counts.files_scanned,
                files_added: counts.files_added,
                files_updated: counts.files_updated,
                files_deleted: counts.files_deleted,
                errors: snapshot.errors,
            }
        }
    };

    job.tracker.update(|p| {
        p.phase = phase;
        p.current_file = None;
    });

    info!(
        scan_id = %job.id,
        status = %history.status,
        scanned = history.files_scanned,
        added = history.files_added,
        updated = history.files_updated,
        deleted = history.files_deleted,
        errors = history.errors.len(),
        "Scan finished"
    );
    history
}
