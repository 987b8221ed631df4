//! In-memory view of the library used during one scan.
//!
//! Loaded once at the start of a run. Lookups never touch the database.
//! Mutations made while a batch is open are journaled so that a batch whose
//! transaction rolls back can be undone in memory as well.

use rusqlite::Connection;
use std::collections::HashMap;
use tvshelf_common::{EpisodeFileId, EpisodeId, Result, SeasonId, ShowId};
use tvshelf_db::models::EpisodeFile;
use tvshelf_db::queries::{episode_files, episodes, seasons, shows};
use tvshelf_parser::show_name_match_key;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedShow {
    pub id: ShowId,
    pub title: String,
    pub folder_name: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedEpisode {
    pub id: EpisodeId,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedFile {
    pub id: EpisodeFileId,
    pub episode_id: EpisodeId,
    pub file_size: u64,
    pub date_modified_ms: i64,
    pub file_exists: bool,
}

impl From<&EpisodeFile> for CachedFile {
    fn from(f: &EpisodeFile) -> Self {
        Self {
            id: f.id,
            episode_id: f.episode_id,
            file_size: f.file_size,
            date_modified_ms: f.date_modified.timestamp_millis(),
            file_exists: f.file_exists,
        }
    }
}

enum Undo {
    ShowInserted(ShowId),
    ShowChanged(CachedShow),
    SeasonInserted((ShowId, u32)),
    EpisodeInserted((SeasonId, u32)),
    EpisodeChanged((SeasonId, u32), CachedEpisode),
    FileSet(String, Option<CachedFile>),
}

#[derive(Default)]
pub struct HierarchyCache {
    shows: HashMap<ShowId, CachedShow>,
    shows_by_folder: HashMap<String, ShowId>,
    shows_by_key: HashMap<String, Vec<ShowId>>,
    seasons: HashMap<(ShowId, u32), SeasonId>,
    episodes: HashMap<(SeasonId, u32), CachedEpisode>,
    files: HashMap<String, CachedFile>,
    journal: Option<Vec<Undo>>,
}

impl HierarchyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the whole library.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut cache = Self::new();
        for show in shows::list_shows(conn)? {
            cache.index_show(CachedShow {
                id: show.id,
                title: show.title,
                folder_name: show.folder_name,
                year: show.year,
            });
        }
        for season in seasons::list_seasons(conn)? {
            cache.seasons.insert((season.show_id, season.season_number), season.id);
        }
        for episode in episodes::list_episodes(conn)? {
            cache.episodes.insert(
                (episode.season_id, episode.episode_number),
                CachedEpisode {
                    id: episode.id,
                    title: episode.title,
                },
            );
        }
        for file in episode_files::list_episode_files(conn)? {
            cache.files.insert(file.file_path.clone(), CachedFile::from(&file));
        }
        tracing::debug!(
            shows = cache.shows.len(),
            seasons = cache.seasons.len(),
            episodes = cache.episodes.len(),
            files = cache.files.len(),
            "Loaded library cache"
        );
        Ok(cache)
    }

    // -- batches ------------------------------------------------------------

    pub fn begin_batch(&mut self) {
        self.journal = Some(Vec::new());
    }

    pub fn commit_batch(&mut self) {
        self.journal = None;
    }

    /// Undo every mutation made since [`begin_batch`](Self::begin_batch).
    pub fn rollback_batch(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::ShowInserted(id) => {
                    if let Some(show) = self.shows.get(&id).cloned() {
                        self.unindex_show(&show);
                    }
                }
                Undo::ShowChanged(previous) => {
                    if let Some(current) = self.shows.get(&previous.id).cloned() {
                        self.unindex_show(&current);
                    }
                    self.index_show(previous);
                }
                Undo::SeasonInserted(key) => {
                    self.seasons.remove(&key);
                }
                Undo::EpisodeInserted(key) => {
                    self.episodes.remove(&key);
                }
                Undo::EpisodeChanged(key, previous) => {
                    self.episodes.insert(key, previous);
                }
                Undo::FileSet(path, previous) => match previous {
                    Some(file) => {
                        self.files.insert(path, file);
                    }
                    None => {
                        self.files.remove(&path);
                    }
                },
            }
        }
    }

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(undo);
        }
    }

    // -- shows --------------------------------------------------------------

    fn index_show(&mut self, show: CachedShow) {
        if let Some(folder) = &show.folder_name {
            self.shows_by_folder.entry(folder.clone()).or_insert(show.id);
        }
        self.shows_by_key
            .entry(show_name_match_key(&show.title))
            .or_default()
            .push(show.id);
        self.shows.insert(show.id, show);
    }

    fn unindex_show(&mut self, show: &CachedShow) {
        if let Some(folder) = &show.folder_name {
            if self.shows_by_folder.get(folder) == Some(&show.id) {
                self.shows_by_folder.remove(folder);
            }
        }
        let key = show_name_match_key(&show.title);
        if let Some(ids) = self.shows_by_key.get_mut(&key) {
            ids.retain(|id| *id != show.id);
            if ids.is_empty() {
                self.shows_by_key.remove(&key);
            }
        }
        self.shows.remove(&show.id);
    }

    pub fn show(&self, id: ShowId) -> Option<&CachedShow> {
        self.shows.get(&id)
    }

    pub fn show_by_folder(&self, folder_name: &str) -> Option<&CachedShow> {
        self.shows_by_folder
            .get(folder_name)
            .and_then(|id| self.shows.get(id))
    }

    /// Shows whose title normalizes to `key`, in insertion order.
    pub fn shows_by_key(&self, key: &str) -> Vec<&CachedShow> {
        self.shows_by_key
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| self.shows.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn insert_show(&mut self, show: CachedShow) {
        self.record(Undo::ShowInserted(show.id));
        self.index_show(show);
    }

    /// Replace a show's cached fields, keeping the indexes in step.
    pub fn update_show(&mut self, show: CachedShow) {
        if let Some(previous) = self.shows.get(&show.id).cloned() {
            self.unindex_show(&previous);
            self.record(Undo::ShowChanged(previous));
        }
        self.index_show(show);
    }

    pub fn show_count(&self) -> usize {
        self.shows.len()
    }

    // -- seasons ------------------------------------------------------------

    pub fn season(&self, show_id: ShowId, season_number: u32) -> Option<SeasonId> {
        self.seasons.get(&(show_id, season_number)).copied()
    }

    pub fn insert_season(&mut self, show_id: ShowId, season_number: u32, id: SeasonId) {
        let key = (show_id, season_number);
        if self.seasons.insert(key, id).is_none() {
            self.record(Undo::SeasonInserted(key));
        }
    }

    // -- episodes -----------------------------------------------------------

    pub fn episode(&self, season_id: SeasonId, episode_number: u32) -> Option<&CachedEpisode> {
        self.episodes.get(&(season_id, episode_number))
    }

    pub fn insert_episode(
        &mut self,
        season_id: SeasonId,
        episode_number: u32,
        episode: CachedEpisode,
    ) {
        let key = (season_id, episode_number);
        match self.episodes.insert(key, episode) {
            Some(previous) => self.record(Undo::EpisodeChanged(key, previous)),
            None => self.record(Undo::EpisodeInserted(key)),
        }
    }

    // -- files --------------------------------------------------------------

    pub fn file(&self, path: &str) -> Option<&CachedFile> {
        self.files.get(path)
    }

    pub fn set_file(&mut self, path: &str, file: CachedFile) {
        let previous = self.files.insert(path.to_string(), file);
        self.record(Undo::FileSet(path.to_string(), previous));
    }

    pub fn files(&self) -> impl Iterator<Item = (&String, &CachedFile)> {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tvshelf_db::pool::{get_conn, init_memory_pool};

    fn show(title: &str, folder: Option<&str>, year: Option<i32>) -> CachedShow {
        CachedShow {
            id: ShowId::new(),
            title: title.into(),
            folder_name: folder.map(String::from),
            year,
        }
    }

    #[test]
    fn test_load_from_database() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let s = shows::create_show(&conn, "Firefly", Some("Firefly (2002)"), Some(2002)).unwrap();
        let season = seasons::find_or_create_season(&conn, s.id, 1).unwrap();
        let ep = episodes::find_or_create_episode(&conn, season.id, 1, Some("Serenity")).unwrap();
        episode_files::create_episode_file(&conn, ep.id, "/tv/a.mkv", "a.mkv", 42, Utc::now(), None)
            .unwrap();

        let cache = HierarchyCache::load(&conn).unwrap();
        assert_eq!(cache.show_count(), 1);
        assert_eq!(cache.show_by_folder("Firefly (2002)").unwrap().id, s.id);
        assert_eq!(cache.shows_by_key("firefly").len(), 1);
        assert_eq!(cache.season(s.id, 1), Some(season.id));
        assert_eq!(cache.episode(season.id, 1).unwrap().title.as_deref(), Some("Serenity"));
        let file = cache.file("/tv/a.mkv").unwrap();
        assert_eq!(file.file_size, 42);
        assert!(file.file_exists);
    }

    #[test]
    fn test_rollback_undoes_batch_only() {
        let mut cache = HierarchyCache::new();
        let kept = show("Kept", Some("Kept"), None);
        let kept_id = kept.id;
        cache.insert_show(kept);

        cache.begin_batch();
        let doomed = show("Doomed", Some("Doomed"), None);
        let doomed_id = doomed.id;
        cache.insert_show(doomed);
        let season_id = SeasonId::new();
        cache.insert_season(doomed_id, 1, season_id);
        cache.insert_episode(
            season_id,
            1,
            CachedEpisode {
                id: EpisodeId::new(),
                title: None,
            },
        );
        cache.set_file(
            "/tv/doomed.mkv",
            CachedFile {
                id: EpisodeFileId::new(),
                episode_id: EpisodeId::new(),
                file_size: 1,
                date_modified_ms: 0,
                file_exists: true,
            },
        );
        cache.rollback_batch();

        assert!(cache.show(kept_id).is_some());
        assert!(cache.show(doomed_id).is_none());
        assert!(cache.show_by_folder("Doomed").is_none());
        assert!(cache.shows_by_key("doomed").is_empty());
        assert!(cache.season(doomed_id, 1).is_none());
        assert!(cache.episode(season_id, 1).is_none());
        assert!(cache.file("/tv/doomed.mkv").is_none());
    }

    #[test]
    fn test_rollback_restores_previous_values() {
        let mut cache = HierarchyCache::new();
        let original = show("Lost", None, None);
        let id = original.id;
        cache.insert_show(original);
        let file = CachedFile {
            id: EpisodeFileId::new(),
            episode_id: EpisodeId::new(),
            file_size: 10,
            date_modified_ms: 5,
            file_exists: true,
        };
        cache.set_file("/tv/lost.mkv", file);

        cache.begin_batch();
        cache.update_show(CachedShow {
            id,
            title: "Lost".into(),
            folder_name: Some("Lost (2004)".into()),
            year: Some(2004),
        });
        cache.set_file("/tv/lost.mkv", CachedFile { file_size: 20, ..file });
        assert!(cache.show_by_folder("Lost (2004)").is_some());
        cache.rollback_batch();

        assert!(cache.show_by_folder("Lost (2004)").is_none());
        assert_eq!(cache.show(id).unwrap().year, None);
        assert_eq!(cache.shows_by_key("lost").len(), 1);
        assert_eq!(cache.file("/tv/lost.mkv").unwrap().file_size, 10);
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut cache = HierarchyCache::new();
        cache.begin_batch();
        let s = show("Kept", None, None);
        let id = s.id;
        cache.insert_show(s);
        cache.commit_batch();
        cache.rollback_batch();
        assert!(cache.show(id).is_some());
    }
}
