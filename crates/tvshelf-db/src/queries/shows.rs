//! Show CRUD operations.

use chrono::Utc;
use rusqlite::{params, Connection};
use tvshelf_common::{Error, Result, ShowId};

use crate::models::Show;

const COLS: &str = "id, title, folder_name, year, created_at, updated_at";

/// Create a new show.
pub fn create_show(
    conn: &Connection,
    title: &str,
    folder_name: Option<&str>,
    year: Option<i32>,
) -> Result<Show> {
    let id = ShowId::new();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO shows (id, title, folder_name, year, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![id.to_string(), title, folder_name, year, now.to_rfc3339()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Show {
        id,
        title: title.to_string(),
        folder_name: folder_name.map(String::from),
        year,
        created_at: now,
        updated_at: now,
    })
}

/// Get a show by ID.
pub fn get_show(conn: &Connection, id: ShowId) -> Result<Option<Show>> {
    let q = format!("SELECT {COLS} FROM shows WHERE id = ?1");
    match conn.query_row(&q, [id.to_string()], Show::from_row) {
        Ok(show) => Ok(Some(show)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all shows ordered by title.
pub fn list_shows(conn: &Connection) -> Result<Vec<Show>> {
    let q = format!("SELECT {COLS} FROM shows ORDER BY title COLLATE NOCASE");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Show::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Fill in folder name and year where they are still unset.
///
/// Existing non-null values are never overwritten. Returns `true` when a
/// column was actually written.
pub fn backfill_show(
    conn: &Connection,
    id: ShowId,
    folder_name: Option<&str>,
    year: Option<i32>,
) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE shows
             SET folder_name = COALESCE(folder_name, ?2),
                 year = COALESCE(year, ?3),
                 updated_at = ?4
             WHERE id = ?1
               AND ((folder_name IS NULL AND ?2 IS NOT NULL)
                 OR (year IS NULL AND ?3 IS NOT NULL))",
            params![id.to_string(), folder_name, year, Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};

    #[test]
    fn test_create_and_get_show() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let show = create_show(&conn, "Firefly", Some("Firefly (2002)"), Some(2002)).unwrap();
        let loaded = get_show(&conn, show.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Firefly");
        assert_eq!(loaded.folder_name.as_deref(), Some("Firefly (2002)"));
        assert_eq!(loaded.year, Some(2002));
    }

    #[test]
    fn test_get_missing_show() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        assert!(get_show(&conn, ShowId::new()).unwrap().is_none());
    }

    #[test]
    fn test_backfill_never_overwrites() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let show = create_show(&conn, "Firefly", None, Some(2002)).unwrap();

        assert!(backfill_show(&conn, show.id, Some("Firefly (2002)"), Some(1999)).unwrap());
        let loaded = get_show(&conn, show.id).unwrap().unwrap();
        assert_eq!(loaded.folder_name.as_deref(), Some("Firefly (2002)"));
        assert_eq!(loaded.year, Some(2002));

        assert!(!backfill_show(&conn, show.id, Some("Other"), Some(2010)).unwrap());
        let loaded = get_show(&conn, show.id).unwrap().unwrap();
        assert_eq!(loaded.folder_name.as_deref(), Some("Firefly (2002)"));
    }

    #[test]
    fn test_list_shows_sorted() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        create_show(&conn, "zeta", None, None).unwrap();
        create_show(&conn, "Alpha", None, None).unwrap();
        let titles: Vec<_> = list_shows(&conn).unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Alpha", "zeta"]);
    }
}
