//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. Column order must match the `COLS` constant of the
//! matching query module.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use serde::Serialize;
use tvshelf_common::{
    EpisodeFileId, EpisodeId, FileAction, FileQuality, ScanError, ScanId, ScanStatus, ScanType,
    SeasonId, ShowId,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))?;
    Ok(T::from(uuid))
}

/// Parse a text column through `FromStr`.
fn parse_enum<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let s: String = row.get(idx)?;
    s.parse::<T>()
        .map_err(|e| conversion_error(idx, std::io::Error::other(e)))
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_opt_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|v| {
        DateTime::parse_from_rfc3339(&v)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn parse_count(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<u64> {
    let n: i64 = row.get(idx)?;
    u64::try_from(n).map_err(|e| conversion_error(idx, e))
}

/// Modification times are stored as unix milliseconds so that equality
/// checks during reconciliation are exact.
pub fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Show
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    /// Raw folder name the show was first observed under.
    pub folder_name: Option<String>,
    pub year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Show {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            title: row.get(1)?,
            folder_name: row.get(2)?,
            year: row.get(3)?,
            created_at: parse_timestamp(row, 4)?,
            updated_at: parse_timestamp(row, 5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Season
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Season {
    pub id: SeasonId,
    pub show_id: ShowId,
    pub season_number: u32,
    pub created_at: DateTime<Utc>,
}

impl Season {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            show_id: parse_id(row, 1)?,
            season_number: row.get(2)?,
            created_at: parse_timestamp(row, 3)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub season_id: SeasonId,
    pub episode_number: u32,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Episode {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            season_id: parse_id(row, 1)?,
            episode_number: row.get(2)?,
            title: row.get(3)?,
            created_at: parse_timestamp(row, 4)?,
            updated_at: parse_timestamp(row, 5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// EpisodeFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeFile {
    pub id: EpisodeFileId,
    pub episode_id: EpisodeId,
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub date_modified: DateTime<Utc>,
    pub file_exists: bool,
    pub quality: FileQuality,
    pub action: FileAction,
    pub container: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub resolution_width: Option<u32>,
    pub resolution_height: Option<u32>,
    pub duration_secs: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EpisodeFile {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let file_size: i64 = row.get(4)?;
        Ok(Self {
            id: parse_id(row, 0)?,
            episode_id: parse_id(row, 1)?,
            file_path: row.get(2)?,
            file_name: row.get(3)?,
            file_size: u64::try_from(file_size).map_err(|e| conversion_error(4, e))?,
            date_modified: millis_to_datetime(row.get(5)?),
            file_exists: row.get::<_, i32>(6)? != 0,
            quality: parse_enum(row, 7)?,
            action: parse_enum(row, 8)?,
            container: row.get(9)?,
            video_codec: row.get(10)?,
            audio_codec: row.get(11)?,
            resolution_width: row.get(12)?,
            resolution_height: row.get(13)?,
            duration_secs: row.get(14)?,
            created_at: parse_timestamp(row, 15)?,
            updated_at: parse_timestamp(row, 16)?,
        })
    }
}

// ---------------------------------------------------------------------------
// ScanHistory
// ---------------------------------------------------------------------------

/// Durable record of one scan invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanHistory {
    pub id: ScanId,
    pub scan_type: ScanType,
    pub status: ScanStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub files_scanned: u64,
    pub files_added: u64,
    pub files_updated: u64,
    pub files_deleted: u64,
    pub errors: Vec<ScanError>,
}

impl ScanHistory {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let errors: String = row.get(9)?;
        Ok(Self {
            id: parse_id(row, 0)?,
            scan_type: parse_enum(row, 1)?,
            status: parse_enum(row, 2)?,
            started_at: parse_timestamp(row, 3)?,
            completed_at: parse_opt_timestamp(row, 4)?,
            files_scanned: parse_count(row, 5)?,
            files_added: parse_count(row, 6)?,
            files_updated: parse_count(row, 7)?,
            files_deleted: parse_count(row, 8)?,
            errors: serde_json::from_str(&errors).map_err(|e| conversion_error(9, e))?,
        })
    }
}

/// Final counters written to a scan history row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanCounts {
    pub files_scanned: u64,
    pub files_added: u64,
    pub files_updated: u64,
    pub files_deleted: u64,
}

/// Technical details extracted from a media file by a probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaDetails {
    pub container: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub resolution_width: Option<u32>,
    pub resolution_height: Option<u32>,
    pub duration_secs: Option<f64>,
}
