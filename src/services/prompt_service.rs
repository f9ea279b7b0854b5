//! Prompt record store
//!
//! CRUD, listing, search and tag queries over prompts. Each public function
//! holds the connection lock for its whole duration; the `*_with_conn`
//! variants let other services compose writes under one lock.

use crate::database::dao::prompts::PromptDao;
use crate::database::dao::versions::VersionDao;
use crate::database::DbConnection;
use crate::error::{VaultError, VaultResult};
use crate::models::{
    collection_tag, normalize_tags, now_millis, NewPrompt, Prompt, PromptFilter, PromptPatch,
    SortBy, TagCount, PLACEHOLDER_TITLE,
};
use crate::services::version_service::VersionService;
use rusqlite::Connection;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

pub const INITIAL_VERSION_NOTES: &str = "Initial version";

pub struct PromptService;

impl PromptService {
    /// Create a prompt; supplied content becomes version 1
    pub fn create(db: &DbConnection, input: NewPrompt) -> VaultResult<String> {
        let conn = db.lock()?;
        Self::create_with_conn(&conn, input)
    }

    pub fn create_with_conn(conn: &Connection, input: NewPrompt) -> VaultResult<String> {
        let title = input
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string());

        let mut prompt = Prompt::new(title);
        prompt.description = input.description;
        prompt.tags = normalize_tags(input.tags);
        PromptDao::insert(conn, &prompt)?;

        if let Some(content) = input.content {
            let notes = input
                .notes
                .or_else(|| Some(INITIAL_VERSION_NOTES.to_string()));
            VersionService::create_version_with_conn(conn, &prompt.id, &content, notes)?;
        }

        tracing::debug!("[Prompt] created {}", prompt.id);
        Ok(prompt.id)
    }

    pub fn get(db: &DbConnection, id: &str) -> VaultResult<Option<Prompt>> {
        let conn = db.lock()?;
        Ok(PromptDao::get_by_id(&conn, id)?)
    }

    /// Like [`PromptService::get`] but absence is an error
    pub fn get_required(conn: &Connection, id: &str) -> VaultResult<Prompt> {
        PromptDao::get_by_id(conn, id)?.ok_or_else(|| VaultError::prompt_not_found(id))
    }

    /// List prompts
    ///
    /// `UpdatedAt` and `CreatedAt` list newest first; `Title` is alphabetical.
    pub fn list(db: &DbConnection, filter: PromptFilter, sort: SortBy) -> VaultResult<Vec<Prompt>> {
        let conn = db.lock()?;
        Self::list_with_conn(&conn, filter, sort)
    }

    pub fn list_with_conn(
        conn: &Connection,
        filter: PromptFilter,
        sort: SortBy,
    ) -> VaultResult<Vec<Prompt>> {
        let mut prompts = PromptDao::list(conn, filter.archived, sort)?;
        match sort {
            SortBy::Title => prompts.sort_by(|a, b| compare_titles(&a.title, &b.title)),
            SortBy::CreatedAt | SortBy::UpdatedAt => prompts.reverse(),
        }
        Ok(prompts)
    }

    /// Merge present fields and refresh `updated_at`
    pub fn update(db: &DbConnection, id: &str, patch: PromptPatch) -> VaultResult<()> {
        let conn = db.lock()?;
        Self::update_with_conn(&conn, id, patch)
    }

    pub fn update_with_conn(conn: &Connection, id: &str, patch: PromptPatch) -> VaultResult<()> {
        let mut prompt = Self::get_required(conn, id)?;
        patch.apply(&mut prompt);
        prompt.updated_at = next_timestamp(prompt.updated_at);
        PromptDao::update(conn, &prompt)?;
        Ok(())
    }

    /// Hard delete removes the prompt and every version; soft delete archives it
    pub fn delete(db: &DbConnection, id: &str, hard: bool) -> VaultResult<()> {
        let conn = db.lock()?;
        if !hard {
            return Self::update_with_conn(&conn, id, PromptPatch::archived(true));
        }

        if !PromptDao::exists(&conn, id)? {
            return Err(VaultError::prompt_not_found(id));
        }
        let removed = VersionDao::delete_by_prompt(&conn, id)?;
        PromptDao::delete(&conn, id)?;
        tracing::info!("[Prompt] deleted {} with {} versions", id, removed);
        Ok(())
    }

    /// Undo a soft delete
    pub fn restore(db: &DbConnection, id: &str) -> VaultResult<()> {
        Self::update(db, id, PromptPatch::archived(false))
    }

    /// Case-insensitive substring search over title, description and tags
    ///
    /// Archived prompts never match. A blank query returns the default listing.
    pub fn search(db: &DbConnection, query: &str) -> VaultResult<Vec<Prompt>> {
        let prompts = Self::list(db, PromptFilter::active(), SortBy::UpdatedAt)?;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(prompts);
        }

        Ok(prompts
            .into_iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
                    || p.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// Non-archived prompts carrying every one of `tags`
    pub fn filter_by_tags(db: &DbConnection, tags: &[String]) -> VaultResult<Vec<Prompt>> {
        let wanted: Vec<String> = normalize_tags(tags.to_vec());
        let prompts = Self::list(db, PromptFilter::active(), SortBy::UpdatedAt)?;
        Ok(prompts
            .into_iter()
            .filter(|p| wanted.iter().all(|t| p.has_tag(t)))
            .collect())
    }

    /// Tag frequency across non-archived prompts, most used first
    pub fn get_all_tags(db: &DbConnection) -> VaultResult<Vec<TagCount>> {
        let prompts = Self::list(db, PromptFilter::active(), SortBy::UpdatedAt)?;
        Ok(count_tags(prompts.iter().map(|p| p.tags.iter().map(String::as_str))))
    }

    /// Collections and how many non-archived prompts each holds
    pub fn list_collections(db: &DbConnection) -> VaultResult<Vec<TagCount>> {
        let prompts = Self::list(db, PromptFilter::active(), SortBy::UpdatedAt)?;
        Ok(count_tags(prompts.iter().map(|p| p.collections().into_iter())))
    }

    pub fn add_to_collection(db: &DbConnection, id: &str, name: &str) -> VaultResult<()> {
        let conn = db.lock()?;
        let prompt = Self::get_required(&conn, id)?;
        let tag = collection_tag(name);
        if prompt.has_tag(&tag) {
            return Ok(());
        }

        let mut tags = prompt.tags;
        tags.push(tag);
        Self::update_with_conn(&conn, id, PromptPatch::tags(tags))
    }

    pub fn remove_from_collection(db: &DbConnection, id: &str, name: &str) -> VaultResult<()> {
        let conn = db.lock()?;
        let prompt = Self::get_required(&conn, id)?;
        let tag = collection_tag(name);
        let tags: Vec<String> = prompt.tags.into_iter().filter(|t| *t != tag).collect();
        Self::update_with_conn(&conn, id, PromptPatch::tags(tags))
    }

    /// Copy metadata and current content into a new prompt
    pub fn duplicate(db: &DbConnection, id: &str) -> VaultResult<String> {
        let conn = db.lock()?;
        let source = Self::get_required(&conn, id)?;
        let content = VersionDao::latest_by_prompt(&conn, id)?.map(|v| v.content);

        Self::create_with_conn(
            &conn,
            NewPrompt {
                title: Some(format!("{} (copy)", source.title)),
                description: source.description,
                tags: source.tags,
                content,
                notes: Some(format!("Duplicated from {}", source.id)),
            },
        )
    }
}

/// `updated_at` for a mutation: now, but always past the previous value
pub fn next_timestamp(previous: i64) -> i64 {
    now_millis().max(previous + 1)
}

/// Alphabetical, ignoring case first and using it only to break ties
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Count each tag once per prompt; order by count desc, then tag asc
fn count_tags<'a, I, T>(per_prompt: I) -> Vec<TagCount>
where
    I: Iterator<Item = T>,
    T: Iterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for tags in per_prompt {
        let unique: HashSet<&str> = tags.collect();
        for tag in unique {
            *counts.entry(tag.to_string()).or_default() += 1;
        }
    }

    let mut result: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    result
}
