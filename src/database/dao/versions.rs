use crate::models::Version;
use rusqlite::{params, Connection, OptionalExtension, Row};

const VERSION_COLUMNS: &str = "id, prompt_id, version, content, notes, created_at, updated_at";

pub struct VersionDao;

fn row_to_version(row: &Row<'_>) -> Result<Version, rusqlite::Error> {
    Ok(Version {
        id: row.get(0)?,
        prompt_id: row.get(1)?,
        version: row.get(2)?,
        content: row.get(3)?,
        notes: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl VersionDao {
    /// Every version, oldest first
    pub fn get_all(conn: &Connection) -> Result<Vec<Version>, rusqlite::Error> {
        let sql =
            format!("SELECT {VERSION_COLUMNS} FROM versions ORDER BY created_at ASC, rowid ASC");
        let mut stmt = conn.prepare(&sql)?;
        let versions = stmt.query_map([], row_to_version)?;
        versions.collect()
    }

    /// Versions of one prompt, newest `created_at` first
    ///
    /// Equal timestamps are ordered by insertion, later first.
    pub fn list_by_prompt(
        conn: &Connection,
        prompt_id: &str,
    ) -> Result<Vec<Version>, rusqlite::Error> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM versions WHERE prompt_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let versions = stmt.query_map(params![prompt_id], row_to_version)?;
        versions.collect()
    }

    pub fn latest_by_prompt(
        conn: &Connection,
        prompt_id: &str,
    ) -> Result<Option<Version>, rusqlite::Error> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM versions WHERE prompt_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT 1"
        );
        conn.query_row(&sql, params![prompt_id], row_to_version)
            .optional()
    }

    pub fn get_by_id(conn: &Connection, id: &str) -> Result<Option<Version>, rusqlite::Error> {
        let sql = format!("SELECT {VERSION_COLUMNS} FROM versions WHERE id = ?1");
        conn.query_row(&sql, params![id], row_to_version).optional()
    }

    pub fn exists(conn: &Connection, id: &str) -> Result<bool, rusqlite::Error> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM versions WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count_by_prompt(conn: &Connection, prompt_id: &str) -> Result<usize, rusqlite::Error> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM versions WHERE prompt_id = ?1",
            params![prompt_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn insert(conn: &Connection, version: &Version) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT INTO versions (id, prompt_id, version, content, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                version.id,
                version.prompt_id,
                version.version,
                version.content,
                version.notes,
                version.created_at,
                version.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Insert unless a version with the same id already exists
    ///
    /// Returns true when a row was written.
    pub fn insert_if_absent(conn: &Connection, version: &Version) -> Result<bool, rusqlite::Error> {
        let rows = conn.execute(
            "INSERT OR IGNORE INTO versions
                 (id, prompt_id, version, content, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                version.id,
                version.prompt_id,
                version.version,
                version.content,
                version.notes,
                version.created_at,
                version.updated_at,
            ],
        )?;
        Ok(rows > 0)
    }

    /// Remove every version of a prompt, returning how many were deleted
    pub fn delete_by_prompt(conn: &Connection, prompt_id: &str) -> Result<usize, rusqlite::Error> {
        conn.execute(
            "DELETE FROM versions WHERE prompt_id = ?1",
            params![prompt_id],
        )
    }

    pub fn count(conn: &Connection) -> Result<usize, rusqlite::Error> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM versions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
