use rusqlite::Connection;

/// 创建表结构
///
/// `versions.prompt_id` carries no foreign key; callers keep it consistent.
pub fn create_tables(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS prompts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            archived INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_prompts_updated_at ON prompts(updated_at);
        CREATE INDEX IF NOT EXISTS idx_prompts_created_at ON prompts(created_at);
        CREATE INDEX IF NOT EXISTS idx_prompts_archived ON prompts(archived);

        CREATE TABLE IF NOT EXISTS versions (
            id TEXT PRIMARY KEY,
            prompt_id TEXT NOT NULL,
            version TEXT NOT NULL,
            content TEXT NOT NULL,
            notes TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_versions_prompt_created
            ON versions(prompt_id, created_at);",
    )
}
