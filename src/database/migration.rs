use crate::database::dao::prompts::PromptDao;
use crate::database::dao::settings::SettingsDao;
use crate::models::normalize_tags;
use rusqlite::Connection;

/// Schema version written by this build
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";
const NORMALIZED_TAGS_KEY: &str = "migrated_normalized_tags";

/// Bring an opened database up to date
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    let current = SettingsDao::get(conn, SCHEMA_VERSION_KEY)?
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);

    if current > SCHEMA_VERSION {
        tracing::warn!(
            "[Migration] database schema v{} is newer than supported v{}",
            current,
            SCHEMA_VERSION
        );
    }

    match normalize_legacy_tags(conn) {
        Ok(count) => {
            if count > 0 {
                tracing::info!("[Migration] normalized tags on {} prompts", count);
            }
        }
        Err(e) => {
            tracing::warn!("[Migration] tag normalization failed (non-fatal): {}", e);
        }
    }

    if current < SCHEMA_VERSION {
        SettingsDao::set(conn, SCHEMA_VERSION_KEY, &SCHEMA_VERSION.to_string())?;
    }
    Ok(())
}

/// Lowercase and trim tags written before normalization was enforced
///
/// Runs once; completion is recorded in `settings`.
pub fn normalize_legacy_tags(conn: &Connection) -> Result<usize, rusqlite::Error> {
    if SettingsDao::is_flag_set(conn, NORMALIZED_TAGS_KEY)? {
        tracing::debug!("[Migration] tags already normalized, skipping");
        return Ok(0);
    }

    let mut migrated_count = 0;
    for mut prompt in PromptDao::get_all(conn)? {
        let normalized = normalize_tags(prompt.tags.clone());
        if normalized != prompt.tags {
            prompt.tags = normalized;
            PromptDao::update(conn, &prompt)?;
            migrated_count += 1;
        }
    }

    SettingsDao::set(conn, NORMALIZED_TAGS_KEY, "true")?;
    Ok(migrated_count)
}
