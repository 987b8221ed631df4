//! Scan history rows: created RUNNING at scan start, finalized exactly once.

use chrono::Utc;
use rusqlite::{params, Connection};
use tvshelf_common::{Error, Result, ScanError, ScanId, ScanPhase, ScanStatus, ScanType};

use crate::models::{ScanCounts, ScanHistory};

const COLS: &str = "id, scan_type, status, started_at, completed_at,
    files_scanned, files_added, files_updated, files_deleted, errors";

/// Insert a new RUNNING scan row.
pub fn create_scan(conn: &Connection, id: ScanId, scan_type: ScanType) -> Result<ScanHistory> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO scan_history (id, scan_type, status, started_at, errors)
         VALUES (?1, ?2, ?3, ?4, '[]')",
        params![
            id.to_string(),
            scan_type.to_string(),
            ScanStatus::Running.to_string(),
            now.to_rfc3339()
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(ScanHistory {
        id,
        scan_type,
        status: ScanStatus::Running,
        started_at: now,
        completed_at: None,
        files_scanned: 0,
        files_added: 0,
        files_updated: 0,
        files_deleted: 0,
        errors: Vec::new(),
    })
}

/// Get a scan row by ID.
pub fn get_scan(conn: &Connection, id: ScanId) -> Result<Option<ScanHistory>> {
    let q = format!("SELECT {COLS} FROM scan_history WHERE id = ?1");
    match conn.query_row(&q, [id.to_string()], ScanHistory::from_row) {
        Ok(s) => Ok(Some(s)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List the most recent scans, newest first.
pub fn list_recent(conn: &Connection, limit: u32) -> Result<Vec<ScanHistory>> {
    let q = format!(
        "SELECT {COLS} FROM scan_history ORDER BY started_at DESC, rowid DESC LIMIT ?1"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([limit], ScanHistory::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Move a RUNNING scan to its terminal status with final counts and errors.
///
/// Rows that already left RUNNING are untouched; returns whether the row
/// was updated.
pub fn finish_scan(
    conn: &Connection,
    id: ScanId,
    status: ScanStatus,
    counts: &ScanCounts,
    errors: &[ScanError],
) -> Result<bool> {
    if !status.is_terminal() {
        return Err(Error::invalid_input("finish_scan requires a terminal status"));
    }
    let errors = serde_json::to_string(errors).map_err(|e| Error::internal(e.to_string()))?;

    let n = conn
        .execute(
            "UPDATE scan_history
             SET status = ?2, completed_at = ?3, files_scanned = ?4, files_added = ?5,
                 files_updated = ?6, files_deleted = ?7, errors = ?8
             WHERE id = ?1 AND status = ?9",
            params![
                id.to_string(),
                status.to_string(),
                Utc::now().to_rfc3339(),
                counts.files_scanned as i64,
                counts.files_added as i64,
                counts.files_updated as i64,
                counts.files_deleted as i64,
                errors,
                ScanStatus::Running.to_string(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Fail every scan left RUNNING by a previous process.
///
/// Called once at startup, before any new scan can be registered.
pub fn reset_orphaned_scans(conn: &Connection) -> Result<usize> {
    let note = serde_json::to_string(&ScanError::fatal(
        ScanPhase::Failed,
        "Scan interrupted by process shutdown",
    ))
    .map_err(|e| Error::internal(e.to_string()))?;

    conn.execute(
        "UPDATE scan_history
         SET status = ?1, completed_at = ?2, errors = json_insert(errors, '$[#]', json(?3))
         WHERE status = ?4",
        params![
            ScanStatus::Failed.to_string(),
            Utc::now().to_rfc3339(),
            note,
            ScanStatus::Running.to_string(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))
}
