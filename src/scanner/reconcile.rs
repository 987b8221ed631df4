//! File reconciliation against the store.

use rusqlite::Connection;
use std::collections::HashSet;
use tvshelf_common::{EpisodeId, Result};
use tvshelf_db::models::MediaDetails;
use tvshelf_db::queries::episode_files;

use super::cache::{CachedFile, HierarchyCache};
use super::discover::DiscoveredFile;

/// What happened to one file during a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Whether a discovered file differs from what is stored, or is new.
pub fn needs_refresh(cache: &HierarchyCache, file: &DiscoveredFile) -> bool {
    match cache.file(&file.path_key()) {
        Some(known) => !matches_disk(known, file),
        None => true,
    }
}

fn matches_disk(known: &CachedFile, file: &DiscoveredFile) -> bool {
    known.file_exists
        && known.file_size == file.file_size
        && known.date_modified_ms == file.date_modified.timestamp_millis()
}

/// Create or update the record for `file`.
///
/// A known file whose size, modification time, existence flag and owning
/// episode all match is left untouched.
pub fn upsert_file(
    conn: &Connection,
    cache: &mut HierarchyCache,
    episode_id: EpisodeId,
    file: &DiscoveredFile,
    details: Option<&MediaDetails>,
) -> Result<FileOutcome> {
    let path = file.path_key();
    let date_modified_ms = file.date_modified.timestamp_millis();

    if let Some(known) = cache.file(&path).copied() {
        if matches_disk(&known, file) && known.episode_id == episode_id {
            return Ok(FileOutcome::Unchanged);
        }
        episode_files::update_episode_file(
            conn,
            known.id,
            episode_id,
            file.file_size,
            file.date_modified,
            details,
        )?;
        cache.set_file(
            &path,
            CachedFile {
                id: known.id,
                episode_id,
                file_size: file.file_size,
                date_modified_ms,
                file_exists: true,
            },
        );
        return Ok(FileOutcome::Updated);
    }

    let created = episode_files::create_episode_file(
        conn,
        episode_id,
        &path,
        &file.filename,
        file.file_size,
        file.date_modified,
        details,
    )?;
    cache.set_file(&path, CachedFile::from(&created));
    Ok(FileOutcome::Created)
}

/// Flag every stored, still-existing file whose path was not seen.
///
/// Returns the number of files newly flagged.
pub fn mark_missing_as_deleted(
    conn: &Connection,
    cache: &mut HierarchyCache,
    seen: &HashSet<String>,
) -> Result<u64> {
    let missing: Vec<(String, CachedFile)> = cache
        .files()
        .filter(|(path, f)| f.file_exists && !seen.contains(path.as_str()))
        .map(|(path, f)| (path.clone(), *f))
        .collect();
    if missing.is_empty() {
        return Ok(0);
    }

    let ids: Vec<_> = missing.iter().map(|(_, f)| f.id).collect();
    let flagged = episode_files::mark_files_missing(conn, &ids)?;

    for (path, file) in missing {
        cache.set_file(
            &path,
            CachedFile {
                file_exists: false,
                ..file
            },
        );
    }
    Ok(flagged)
}
