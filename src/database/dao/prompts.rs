use crate::models::{Prompt, SortBy};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROMPT_COLUMNS: &str = "id, title, description, tags, archived, created_at, updated_at";

pub struct PromptDao;

fn row_to_prompt(row: &Row<'_>) -> Result<Prompt, rusqlite::Error> {
    let tags_json: String = row.get(3)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(Prompt {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        tags,
        archived: row.get::<_, i32>(4)? == 1,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn tags_to_json(tags: &[String]) -> Result<String, rusqlite::Error> {
    serde_json::to_string(tags).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

impl PromptDao {
    /// All prompts in insertion-time order, archived included
    pub fn get_all(conn: &Connection) -> Result<Vec<Prompt>, rusqlite::Error> {
        Self::list(conn, None, SortBy::CreatedAt)
    }

    /// Prompts matching the archived filter, in ascending index order of `sort`
    ///
    /// Timestamp ties fall back to insertion order.
    pub fn list(
        conn: &Connection,
        archived: Option<bool>,
        sort: SortBy,
    ) -> Result<Vec<Prompt>, rusqlite::Error> {
        let order = match sort {
            SortBy::Title => "title COLLATE NOCASE ASC, rowid ASC",
            SortBy::CreatedAt => "created_at ASC, rowid ASC",
            SortBy::UpdatedAt => "updated_at ASC, rowid ASC",
        };
        let sql = format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts
             WHERE (?1 IS NULL OR archived = ?1)
             ORDER BY {order}"
        );

        let mut stmt = conn.prepare(&sql)?;
        let archived = archived.map(|a| if a { 1 } else { 0 });
        let prompts = stmt.query_map(params![archived], row_to_prompt)?;
        prompts.collect()
    }

    /// Get a single prompt by id
    pub fn get_by_id(conn: &Connection, id: &str) -> Result<Option<Prompt>, rusqlite::Error> {
        let sql = format!("SELECT {PROMPT_COLUMNS} FROM prompts WHERE id = ?1");
        conn.query_row(&sql, params![id], row_to_prompt).optional()
    }

    pub fn exists(conn: &Connection, id: &str) -> Result<bool, rusqlite::Error> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM prompts WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a new prompt
    pub fn insert(conn: &Connection, prompt: &Prompt) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT INTO prompts (id, title, description, tags, archived, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                prompt.id,
                prompt.title,
                prompt.description,
                tags_to_json(&prompt.tags)?,
                if prompt.archived { 1 } else { 0 },
                prompt.created_at,
                prompt.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Overwrite every mutable column of an existing prompt
    ///
    /// Returns false when no row carries the id.
    pub fn update(conn: &Connection, prompt: &Prompt) -> Result<bool, rusqlite::Error> {
        let rows = conn.execute(
            "UPDATE prompts SET title = ?1, description = ?2, tags = ?3, archived = ?4,
                created_at = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                prompt.title,
                prompt.description,
                tags_to_json(&prompt.tags)?,
                if prompt.archived { 1 } else { 0 },
                prompt.created_at,
                prompt.updated_at,
                prompt.id,
            ],
        )?;
        Ok(rows > 0)
    }

    /// Bump `updated_at` only
    pub fn touch(conn: &Connection, id: &str, updated_at: i64) -> Result<bool, rusqlite::Error> {
        let rows = conn.execute(
            "UPDATE prompts SET updated_at = ?1 WHERE id = ?2",
            params![updated_at, id],
        )?;
        Ok(rows > 0)
    }

    /// Delete a prompt
    pub fn delete(conn: &Connection, id: &str) -> Result<bool, rusqlite::Error> {
        let rows = conn.execute("DELETE FROM prompts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn count(conn: &Connection) -> Result<usize, rusqlite::Error> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM prompts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
