use rusqlite::{params, Connection, OptionalExtension};

pub struct SettingsDao;

impl SettingsDao {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Flag-style settings stored as `"true"`
    pub fn is_flag_set(conn: &Connection, key: &str) -> Result<bool, rusqlite::Error> {
        Ok(Self::get(conn, key)?.as_deref() == Some("true"))
    }

    pub fn delete(conn: &Connection, key: &str) -> Result<bool, rusqlite::Error> {
        let rows = conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::create_tables;

    #[test]
    fn test_get_set_delete() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        assert_eq!(SettingsDao::get(&conn, "k").unwrap(), None);
        SettingsDao::set(&conn, "k", "v1").unwrap();
        SettingsDao::set(&conn, "k", "v2").unwrap();
        assert_eq!(SettingsDao::get(&conn, "k").unwrap().as_deref(), Some("v2"));

        assert!(SettingsDao::delete(&conn, "k").unwrap());
        assert!(!SettingsDao::delete(&conn, "k").unwrap());
    }

    #[test]
    fn test_flag() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        assert!(!SettingsDao::is_flag_set(&conn, "done").unwrap());
        SettingsDao::set(&conn, "done", "true").unwrap();
        assert!(SettingsDao::is_flag_set(&conn, "done").unwrap());
    }
}
