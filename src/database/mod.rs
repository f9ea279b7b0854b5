pub mod dao;
pub mod migration;
pub mod schema;

use crate::config::Config;
use crate::error::VaultResult;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub type DbConnection = Arc<Mutex<Connection>>;

/// 获取数据库文件路径
///
/// Creates the data directory when missing.
pub fn get_db_path(config: &Config) -> VaultResult<PathBuf> {
    let db_path = config.database_path();
    if let Some(db_dir) = db_path.parent() {
        std::fs::create_dir_all(db_dir)?;
    }
    Ok(db_path)
}

/// 初始化数据库连接
pub fn init_database(config: &Config) -> VaultResult<DbConnection> {
    let db_path = get_db_path(config)?;
    let conn = Connection::open(&db_path)?;
    tracing::info!("[Database] opened {:?}", db_path);

    prepare(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Fresh in-memory database with schema applied
pub fn open_in_memory() -> VaultResult<DbConnection> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn prepare(conn: &Connection) -> VaultResult<()> {
    schema::create_tables(conn)?;
    migration::run_migrations(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_database_creates_file() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: dir.path().join("data").to_string_lossy().to_string(),
            ..Default::default()
        };

        let db = init_database(&config).unwrap();
        assert!(config.database_path().exists());

        let conn = db.lock().unwrap();
        let count = dao::prompts::PromptDao::count(&conn).unwrap();
        assert_eq!(count, 0);
    }
}
