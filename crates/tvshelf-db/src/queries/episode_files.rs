//! Episode file records.
//!
//! A file is identified by its absolute path. The scanner never deletes
//! rows here; files that vanish from disk get `file_exists = 0` and the
//! `missing` action instead.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use tvshelf_common::{EpisodeFileId, EpisodeId, Error, FileAction, FileQuality, Result};

use crate::models::{EpisodeFile, MediaDetails};

const COLS: &str = "id, episode_id, file_path, file_name, file_size, date_modified,
    file_exists, quality, action, container, video_codec, audio_codec,
    resolution_width, resolution_height, duration_secs, created_at, updated_at";

/// SQLite caps bound parameters per statement; stay well below it.
const MISSING_CHUNK: usize = 500;

fn size_param(file_size: u64) -> Result<i64> {
    i64::try_from(file_size)
        .map_err(|_| Error::invalid_input(format!("file size {} too large", file_size)))
}

/// Create a new file record with the default "needs review" markers.
pub fn create_episode_file(
    conn: &Connection,
    episode_id: EpisodeId,
    file_path: &str,
    file_name: &str,
    file_size: u64,
    date_modified: DateTime<Utc>,
    details: Option<&MediaDetails>,
) -> Result<EpisodeFile> {
    let id = EpisodeFileId::new();
    let now = Utc::now();
    let details = details.cloned().unwrap_or_default();
    let quality = FileQuality::default();
    let action = FileAction::NeedsReview;

    conn.execute(
        "INSERT INTO episode_files (id, episode_id, file_path, file_name, file_size, date_modified,
            file_exists, quality, action, container, video_codec, audio_codec,
            resolution_width, resolution_height, duration_secs, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
        params![
            id.to_string(),
            episode_id.to_string(),
            file_path,
            file_name,
            size_param(file_size)?,
            date_modified.timestamp_millis(),
            quality.to_string(),
            action.to_string(),
            details.container,
            details.video_codec,
            details.audio_codec,
            details.resolution_width,
            details.resolution_height,
            details.duration_secs,
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(EpisodeFile {
        id,
        episode_id,
        file_path: file_path.to_string(),
        file_name: file_name.to_string(),
        file_size,
        date_modified,
        file_exists: true,
        quality,
        action,
        container: details.container,
        video_codec: details.video_codec,
        audio_codec: details.audio_codec,
        resolution_width: details.resolution_width,
        resolution_height: details.resolution_height,
        duration_secs: details.duration_secs,
        created_at: now,
        updated_at: now,
    })
}

/// Record a changed file: new size, modification time and owning episode.
///
/// Marks the file existing again. A file coming back after being marked
/// missing is flagged for review. Probe details, when given, replace the
/// stored ones.
pub fn update_episode_file(
    conn: &Connection,
    id: EpisodeFileId,
    episode_id: EpisodeId,
    file_size: u64,
    date_modified: DateTime<Utc>,
    details: Option<&MediaDetails>,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let n = conn
        .execute(
            "UPDATE episode_files
             SET episode_id = ?2, file_size = ?3, date_modified = ?4,
                 action = CASE WHEN file_exists = 0 THEN ?5 ELSE action END,
                 file_exists = 1, updated_at = ?6
             WHERE id = ?1",
            params![
                id.to_string(),
                episode_id.to_string(),
                size_param(file_size)?,
                date_modified.timestamp_millis(),
                FileAction::NeedsReview.to_string(),
                now,
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Err(Error::not_found(format!("episode file {}", id)));
    }

    if let Some(d) = details {
        conn.execute(
            "UPDATE episode_files
             SET container = ?2, video_codec = ?3, audio_codec = ?4,
                 resolution_width = ?5, resolution_height = ?6, duration_secs = ?7
             WHERE id = ?1",
            params![
                id.to_string(),
                d.container,
                d.video_codec,
                d.audio_codec,
                d.resolution_width,
                d.resolution_height,
                d.duration_secs,
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    }
    Ok(())
}

/// Get a file record by absolute path.
pub fn get_by_path(conn: &Connection, file_path: &str) -> Result<Option<EpisodeFile>> {
    let q = format!("SELECT {COLS} FROM episode_files WHERE file_path = ?1");
    match conn.query_row(&q, [file_path], EpisodeFile::from_row) {
        Ok(f) => Ok(Some(f)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List every file record.
pub fn list_episode_files(conn: &Connection) -> Result<Vec<EpisodeFile>> {
    let q = format!("SELECT {COLS} FROM episode_files ORDER BY file_path");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], EpisodeFile::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Flag the given files as gone from disk, in one transaction.
///
/// Returns how many rows changed state (files already flagged are skipped).
pub fn mark_files_missing(conn: &Connection, ids: &[EpisodeFileId]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let now = Utc::now().to_rfc3339();
    let mut changed = 0u64;

    for chunk in ids.chunks(MISSING_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "UPDATE episode_files SET file_exists = 0, action = ?, updated_at = ?
             WHERE file_exists = 1 AND id IN ({placeholders})"
        );
        let bound = [FileAction::Missing.to_string(), now.clone()]
            .into_iter()
            .chain(chunk.iter().map(|id| id.to_string()));
        let n = tx
            .execute(&sql, params_from_iter(bound))
            .map_err(|e| Error::database(e.to_string()))?;
        changed += n as u64;
    }

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};
    use crate::queries::{episodes, seasons, shows};
    use chrono::TimeZone;

    fn episode(conn: &Connection) -> EpisodeId {
        let show = shows::create_show(conn, "Firefly", None, None).unwrap();
        let season = seasons::find_or_create_season(conn, show.id, 1).unwrap();
        episodes::find_or_create_episode(conn, season.id, 1, None).unwrap().id
    }

    fn mtime() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
    }

    #[test]
    fn test_create_defaults_to_needs_review() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let ep = episode(&conn);

        create_episode_file(&conn, ep, "/tv/a.mkv", "a.mkv", 1_500_000_000, mtime(), None).unwrap();
        let f = get_by_path(&conn, "/tv/a.mkv").unwrap().unwrap();
        assert_eq!(f.quality, FileQuality::Unverified);
        assert_eq!(f.action, FileAction::NeedsReview);
        assert!(f.file_exists);
        assert_eq!(f.file_size, 1_500_000_000);
        assert_eq!(f.date_modified, mtime());
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let ep = episode(&conn);

        create_episode_file(&conn, ep, "/tv/a.mkv", "a.mkv", 1, mtime(), None).unwrap();
        assert!(create_episode_file(&conn, ep, "/tv/a.mkv", "a.mkv", 1, mtime(), None).is_err());
    }

    #[test]
    fn test_mark_missing_and_reappear() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let ep = episode(&conn);

        let a = create_episode_file(&conn, ep, "/tv/a.mkv", "a.mkv", 1, mtime(), None).unwrap();
        let b = create_episode_file(&conn, ep, "/tv/b.mkv", "b.mkv", 1, mtime(), None).unwrap();

        assert_eq!(mark_files_missing(&conn, &[b.id]).unwrap(), 1);
        assert_eq!(mark_files_missing(&conn, &[b.id]).unwrap(), 0);

        let a_row = get_by_path(&conn, "/tv/a.mkv").unwrap().unwrap();
        let b_row = get_by_path(&conn, "/tv/b.mkv").unwrap().unwrap();
        assert!(a_row.file_exists);
        assert!(!b_row.file_exists);
        assert_eq!(b_row.action, FileAction::Missing);

        update_episode_file(&conn, b.id, ep, 2, mtime(), None).unwrap();
        let b_row = get_by_path(&conn, "/tv/b.mkv").unwrap().unwrap();
        assert!(b_row.file_exists);
        assert_eq!(b_row.action, FileAction::NeedsReview);
        assert_eq!(b_row.file_size, 2);
        let _ = a;
    }

    #[test]
    fn test_mark_missing_many_chunks() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let ep = episode(&conn);

        let ids: Vec<_> = (0..(MISSING_CHUNK + 7))
            .map(|i| {
                let path = format!("/tv/{i}.mkv");
                create_episode_file(&conn, ep, &path, "x.mkv", 1, mtime(), None)
                    .unwrap()
                    .id
            })
            .collect();

        assert_eq!(mark_files_missing(&conn, &ids).unwrap(), ids.len() as u64);
    }

    #[test]
    fn test_update_replaces_details() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let ep = episode(&conn);

        let f = create_episode_file(&conn, ep, "/tv/a.mkv", "a.mkv", 1, mtime(), None).unwrap();
        let details = MediaDetails {
            container: Some("matroska".into()),
            video_codec: Some("hevc".into()),
            resolution_width: Some(1920),
            resolution_height: Some(1080),
            ..Default::default()
        };
        update_episode_file(&conn, f.id, ep, 5, mtime(), Some(&details)).unwrap();

        let row = get_by_path(&conn, "/tv/a.mkv").unwrap().unwrap();
        assert_eq!(row.video_codec.as_deref(), Some("hevc"));
        assert_eq!(row.resolution_width, Some(1920));
    }
}
