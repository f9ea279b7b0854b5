//! Application state
//!
//! `PromptVault` owns the database connection, the loaded configuration and
//! the in-memory encryption key. Writes are validated here, before they reach
//! the services, when `validation.enabled` is set.

use crate::backends::{create_backend, BackupBackend};
use crate::config::Config;
use crate::crypto::{load_or_create_salt, CryptoService};
use crate::database::{self, DbConnection};
use crate::diff::DiffLine;
use crate::error::VaultResult;
use crate::models::{
    collection_tag, ExportDocument, ImportResult, NewPrompt, Prompt, PromptFilter, PromptPatch,
    SortBy, TagCount, Version, VersionEntry,
};
use crate::services::backup_service::BackupService;
use crate::services::prompt_service::PromptService;
use crate::services::transfer_service::TransferService;
use crate::services::version_service::VersionService;
use crate::validation;

pub struct PromptVault {
    db: DbConnection,
    config: Config,
    crypto: CryptoService,
}

impl PromptVault {
    /// Open (or create) the database named by `config`
    pub fn open(config: Config) -> VaultResult<Self> {
        config.validate()?;
        let db = database::init_database(&config)?;
        Ok(Self::with_connection(db, config))
    }

    pub fn open_in_memory(config: Config) -> VaultResult<Self> {
        config.validate()?;
        Ok(Self::with_connection(database::open_in_memory()?, config))
    }

    pub fn with_connection(db: DbConnection, config: Config) -> Self {
        Self {
            db,
            config,
            crypto: CryptoService::new(),
        }
    }

    pub fn db(&self) -> &DbConnection {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn validating(&self) -> bool {
        self.config.validation.enabled
    }

    // ------------------------------------------------------------------
    // Prompts
    // ------------------------------------------------------------------

    pub fn create_prompt(&self, input: NewPrompt) -> VaultResult<String> {
        if self.validating() {
            validation::validate_new_prompt(&input)?;
        }
        PromptService::create(&self.db, input)
    }

    pub fn get_prompt(&self, id: &str) -> VaultResult<Option<Prompt>> {
        PromptService::get(&self.db, id)
    }

    pub fn list_prompts(&self, filter: PromptFilter, sort: SortBy) -> VaultResult<Vec<Prompt>> {
        PromptService::list(&self.db, filter, sort)
    }

    pub fn update_prompt(&self, id: &str, patch: PromptPatch) -> VaultResult<()> {
        if self.validating() {
            validation::validate_patch(&patch)?;
        }
        PromptService::update(&self.db, id, patch)
    }

    pub fn delete_prompt(&self, id: &str, hard: bool) -> VaultResult<()> {
        PromptService::delete(&self.db, id, hard)
    }

    pub fn restore_prompt(&self, id: &str) -> VaultResult<()> {
        PromptService::restore(&self.db, id)
    }

    pub fn duplicate_prompt(&self, id: &str) -> VaultResult<String> {
        PromptService::duplicate(&self.db, id)
    }

    pub fn search_prompts(&self, query: &str) -> VaultResult<Vec<Prompt>> {
        PromptService::search(&self.db, query)
    }

    pub fn filter_by_tags(&self, tags: &[String]) -> VaultResult<Vec<Prompt>> {
        PromptService::filter_by_tags(&self.db, tags)
    }

    pub fn get_all_tags(&self) -> VaultResult<Vec<TagCount>> {
        PromptService::get_all_tags(&self.db)
    }

    pub fn list_collections(&self) -> VaultResult<Vec<TagCount>> {
        PromptService::list_collections(&self.db)
    }

    pub fn add_to_collection(&self, id: &str, name: &str) -> VaultResult<()> {
        if self.validating() {
            validation::validate_tag(&collection_tag(name))?;
        }
        PromptService::add_to_collection(&self.db, id, name)
    }

    pub fn remove_from_collection(&self, id: &str, name: &str) -> VaultResult<()> {
        PromptService::remove_from_collection(&self.db, id, name)
    }

    // ------------------------------------------------------------------
    // Versions
    // ------------------------------------------------------------------

    pub fn create_version(
        &self,
        prompt_id: &str,
        content: &str,
        notes: Option<String>,
    ) -> VaultResult<String> {
        if self.validating() {
            validation::validate_content(content)?;
        }
        VersionService::create_version(&self.db, prompt_id, content, notes)
    }

    pub fn list_versions(&self, prompt_id: &str) -> VaultResult<Vec<Version>> {
        VersionService::list_versions(&self.db, prompt_id)
    }

    pub fn latest_version(&self, prompt_id: &str) -> VaultResult<Option<Version>> {
        VersionService::latest_version(&self.db, prompt_id)
    }

    pub fn get_version(&self, version_id: &str) -> VaultResult<Option<Version>> {
        VersionService::get_version(&self.db, version_id)
    }

    pub fn rollback_to_version(&self, version_id: &str) -> VaultResult<String> {
        VersionService::rollback_to_version(&self.db, version_id)
    }

    pub fn version_history(&self, prompt_id: &str) -> VaultResult<Vec<VersionEntry>> {
        VersionService::version_history(&self.db, prompt_id)
    }

    pub fn compare_versions(&self, old_id: &str, new_id: &str) -> VaultResult<Vec<DiffLine>> {
        VersionService::compare_versions(&self.db, old_id, new_id)
    }

    // ------------------------------------------------------------------
    // Import / export
    // ------------------------------------------------------------------

    pub fn export(&self) -> VaultResult<ExportDocument> {
        TransferService::export(&self.db)
    }

    pub fn export_json(&self) -> VaultResult<String> {
        TransferService::export_json(&self.db)
    }

    pub fn import(&self, doc: &serde_json::Value, merge: bool) -> VaultResult<ImportResult> {
        TransferService::import(&self.db, doc, merge)
    }

    pub fn import_json(&self, text: &str, merge: bool) -> VaultResult<ImportResult> {
        TransferService::import_json(&self.db, text, merge)
    }

    // ------------------------------------------------------------------
    // Encryption key
    // ------------------------------------------------------------------

    /// Derive the backup key from `passphrase` and this install's salt
    pub fn unlock(&mut self, passphrase: &str) -> VaultResult<()> {
        let salt = {
            let conn = self.db.lock()?;
            load_or_create_salt(&conn)?
        };
        self.crypto.unlock(passphrase, &salt)
    }

    pub fn lock(&mut self) {
        self.crypto.lock();
    }

    pub fn is_unlocked(&self) -> bool {
        self.crypto.is_unlocked()
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Back up to the configured backend; returns the remote id
    pub async fn backup(&self) -> VaultResult<String> {
        let backend = create_backend(&self.config.backup.backend)?;
        self.backup_to(backend.as_ref()).await
    }

    /// Restore from the configured backend
    ///
    /// `merge` falls back to `backup.merge_on_restore`.
    pub async fn restore(&self, merge: Option<bool>) -> VaultResult<ImportResult> {
        let backend = create_backend(&self.config.backup.backend)?;
        self.restore_from(backend.as_ref(), merge).await
    }

    /// Encrypts when `backup.encrypt` is set; a locked key is then an error
    pub async fn backup_to(&self, backend: &dyn BackupBackend) -> VaultResult<String> {
        let crypto = self.config.backup.encrypt.then_some(&self.crypto);
        BackupService::backup(&self.db, backend, crypto, &self.config.backup.file_name).await
    }

    pub async fn restore_from(
        &self,
        backend: &dyn BackupBackend,
        merge: Option<bool>,
    ) -> VaultResult<ImportResult> {
        let merge = merge.unwrap_or(self.config.backup.merge_on_restore);
        let crypto = self.crypto.is_unlocked().then_some(&self.crypto);
        BackupService::restore(
            &self.db,
            backend,
            crypto,
            &self.config.backup.file_name,
            merge,
        )
        .await
    }
}
