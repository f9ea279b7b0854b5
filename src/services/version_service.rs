//! Version history
//!
//! History is append-only: new content and rollbacks both add a version,
//! nothing is rewritten. `created_at` decides which version is current; the
//! stored `v<N>` label is only what the count was at write time.

use crate::database::dao::prompts::PromptDao;
use crate::database::dao::versions::VersionDao;
use crate::database::DbConnection;
use crate::diff::{diff, DiffLine};
use crate::error::{VaultError, VaultResult};
use crate::models::{version_label, Version, VersionEntry};
use crate::services::prompt_service::{next_timestamp, PromptService};
use rusqlite::Connection;

pub struct VersionService;

impl VersionService {
    /// Append a version and touch the parent prompt
    pub fn create_version(
        db: &DbConnection,
        prompt_id: &str,
        content: &str,
        notes: Option<String>,
    ) -> VaultResult<String> {
        let conn = db.lock()?;
        Self::create_version_with_conn(&conn, prompt_id, content, notes)
    }

    pub fn create_version_with_conn(
        conn: &Connection,
        prompt_id: &str,
        content: &str,
        notes: Option<String>,
    ) -> VaultResult<String> {
        let prompt = PromptService::get_required(conn, prompt_id)?;
        let existing = VersionDao::count_by_prompt(conn, prompt_id)?;
        let version = Version::next(prompt_id, existing, content, notes);
        VersionDao::insert(conn, &version)?;

        PromptDao::touch(conn, prompt_id, next_timestamp(prompt.updated_at))?;

        tracing::debug!(
            "[Version] {} {} for prompt {}",
            version.version,
            version.id,
            prompt_id
        );
        Ok(version.id)
    }

    /// Newest `created_at` first
    pub fn list_versions(db: &DbConnection, prompt_id: &str) -> VaultResult<Vec<Version>> {
        let conn = db.lock()?;
        Ok(VersionDao::list_by_prompt(&conn, prompt_id)?)
    }

    pub fn latest_version(db: &DbConnection, prompt_id: &str) -> VaultResult<Option<Version>> {
        let conn = db.lock()?;
        Ok(VersionDao::latest_by_prompt(&conn, prompt_id)?)
    }

    pub fn get_version(db: &DbConnection, version_id: &str) -> VaultResult<Option<Version>> {
        let conn = db.lock()?;
        Ok(VersionDao::get_by_id(&conn, version_id)?)
    }

    /// Append a copy of an older version's content
    ///
    /// The source version is left untouched.
    pub fn rollback_to_version(db: &DbConnection, version_id: &str) -> VaultResult<String> {
        let conn = db.lock()?;
        let target = VersionDao::get_by_id(&conn, version_id)?
            .ok_or_else(|| VaultError::version_not_found(version_id))?;

        let notes = format!("Rollback to {}", target.version);
        let new_id =
            Self::create_version_with_conn(&conn, &target.prompt_id, &target.content, Some(notes))?;

        tracing::info!(
            "[Version] rolled prompt {} back to {} as {}",
            target.prompt_id,
            target.version,
            new_id
        );
        Ok(new_id)
    }

    /// History with labels regenerated from creation order
    ///
    /// Stored labels can collide after merge imports; `display_label` cannot.
    pub fn version_history(db: &DbConnection, prompt_id: &str) -> VaultResult<Vec<VersionEntry>> {
        let versions = Self::list_versions(db, prompt_id)?;
        let total = versions.len();

        Ok(versions
            .into_iter()
            .enumerate()
            .map(|(idx, version)| VersionEntry {
                version,
                display_label: version_label(total - idx),
                is_current: idx == 0,
            })
            .collect())
    }

    /// Diff two stored versions, older one first
    pub fn compare_versions(
        db: &DbConnection,
        old_version_id: &str,
        new_version_id: &str,
    ) -> VaultResult<Vec<DiffLine>> {
        let conn = db.lock()?;
        let old = VersionDao::get_by_id(&conn, old_version_id)?
            .ok_or_else(|| VaultError::version_not_found(old_version_id))?;
        let new = VersionDao::get_by_id(&conn, new_version_id)?
            .ok_or_else(|| VaultError::version_not_found(new_version_id))?;
        Ok(diff(&old.content, &new.content))
    }
}
