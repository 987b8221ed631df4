//! Episode operations keyed by (season, episode number).

use chrono::Utc;
use rusqlite::{params, Connection};
use tvshelf_common::{EpisodeId, Error, Result, SeasonId};

use crate::models::Episode;

const COLS: &str = "id, season_id, episode_number, title, created_at, updated_at";

/// Get an episode by its natural key.
pub fn get_episode(
    conn: &Connection,
    season_id: SeasonId,
    episode_number: u32,
) -> Result<Option<Episode>> {
    let q = format!("SELECT {COLS} FROM episodes WHERE season_id = ?1 AND episode_number = ?2");
    match conn.query_row(
        &q,
        params![season_id.to_string(), episode_number],
        Episode::from_row,
    ) {
        Ok(ep) => Ok(Some(ep)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Find the episode for `(season_id, episode_number)`, creating it if absent.
///
/// `title` is only used when the row is created.
pub fn find_or_create_episode(
    conn: &Connection,
    season_id: SeasonId,
    episode_number: u32,
    title: Option<&str>,
) -> Result<Episode> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO episodes (id, season_id, episode_number, title, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(season_id, episode_number) DO NOTHING",
        params![
            EpisodeId::new().to_string(),
            season_id.to_string(),
            episode_number,
            title,
            now
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get_episode(conn, season_id, episode_number)?.ok_or_else(|| {
        Error::internal(format!("episode {} of season {} vanished", episode_number, season_id))
    })
}

/// Replace an episode's title.
pub fn update_episode_title(conn: &Connection, id: EpisodeId, title: &str) -> Result<()> {
    let n = conn
        .execute(
            "UPDATE episodes SET title = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), title, Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Err(Error::not_found(format!("episode {}", id)));
    }
    Ok(())
}

/// List every episode in the library.
pub fn list_episodes(conn: &Connection) -> Result<Vec<Episode>> {
    let q = format!("SELECT {COLS} FROM episodes ORDER BY season_id, episode_number");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Episode::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};
    use crate::queries::{seasons, shows};

    fn season(conn: &Connection) -> SeasonId {
        let show = shows::create_show(conn, "Firefly", None, None).unwrap();
        seasons::find_or_create_season(conn, show.id, 1).unwrap().id
    }

    #[test]
    fn test_find_or_create_keeps_first_title() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let season_id = season(&conn);

        let ep = find_or_create_episode(&conn, season_id, 1, Some("Serenity")).unwrap();
        let again = find_or_create_episode(&conn, season_id, 1, Some("Other")).unwrap();
        assert_eq!(ep.id, again.id);
        assert_eq!(again.title.as_deref(), Some("Serenity"));
    }

    #[test]
    fn test_update_title() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let season_id = season(&conn);

        let ep = find_or_create_episode(&conn, season_id, 2, None).unwrap();
        update_episode_title(&conn, ep.id, "The Train Job").unwrap();
        let loaded = get_episode(&conn, season_id, 2).unwrap().unwrap();
        assert_eq!(loaded.title.as_deref(), Some("The Train Job"));

        assert!(update_episode_title(&conn, EpisodeId::new(), "x").is_err());
    }

    #[test]
    fn test_episode_number_must_be_positive() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let season_id = season(&conn);
        assert!(find_or_create_episode(&conn, season_id, 0, None).is_err());
    }
}
