//! Season operations keyed by (show, season number).

use chrono::Utc;
use rusqlite::{params, Connection};
use tvshelf_common::{Error, Result, SeasonId, ShowId};

use crate::models::Season;

const COLS: &str = "id, show_id, season_number, created_at";

/// Get a season by its natural key.
pub fn get_season(
    conn: &Connection,
    show_id: ShowId,
    season_number: u32,
) -> Result<Option<Season>> {
    let q = format!("SELECT {COLS} FROM seasons WHERE show_id = ?1 AND season_number = ?2");
    match conn.query_row(
        &q,
        params![show_id.to_string(), season_number],
        Season::from_row,
    ) {
        Ok(season) => Ok(Some(season)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Find the season for `(show_id, season_number)`, creating it if absent.
///
/// The insert is `ON CONFLICT DO NOTHING`, so a concurrent writer that
/// created the same season first is picked up by the following lookup.
pub fn find_or_create_season(
    conn: &Connection,
    show_id: ShowId,
    season_number: u32,
) -> Result<Season> {
    conn.execute(
        "INSERT INTO seasons (id, show_id, season_number, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(show_id, season_number) DO NOTHING",
        params![
            SeasonId::new().to_string(),
            show_id.to_string(),
            season_number,
            Utc::now().to_rfc3339()
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get_season(conn, show_id, season_number)?.ok_or_else(|| {
        Error::internal(format!(
            "season {} of show {} vanished",
            season_number, show_id
        ))
    })
}

/// List every season in the library.
pub fn list_seasons(conn: &Connection) -> Result<Vec<Season>> {
    let q = format!("SELECT {COLS} FROM seasons ORDER BY show_id, season_number");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Season::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}
