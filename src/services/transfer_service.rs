//! Import/export
//!
//! Export dumps every prompt and version. Import is keyed on ids: unknown
//! prompts are inserted with their ids and timestamps kept and their tags
//! normalized, known ones are skipped or merged depending on the caller's
//! flag. Prompts are processed one by one; a failure part way leaves the
//! earlier ones committed.

use crate::database::dao::prompts::PromptDao;
use crate::database::dao::versions::VersionDao;
use crate::database::DbConnection;
use crate::error::{VaultError, VaultResult};
use crate::models::{
    normalize_tags, ExportDocument, ImportResult, Prompt, Version, EXPORT_FORMAT_VERSION,
};
use crate::services::prompt_service::next_timestamp;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub struct TransferService;

impl TransferService {
    pub fn export(db: &DbConnection) -> VaultResult<ExportDocument> {
        let conn = db.lock()?;
        let prompts = PromptDao::get_all(&conn)?;
        let versions = VersionDao::get_all(&conn)?;
        tracing::info!(
            "[Export] {} prompts, {} versions",
            prompts.len(),
            versions.len()
        );
        Ok(ExportDocument::new(prompts, versions))
    }

    pub fn export_json(db: &DbConnection) -> VaultResult<String> {
        let doc = Self::export(db)?;
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Import a parsed document
    ///
    /// The whole document is checked before anything is written.
    pub fn import(db: &DbConnection, doc: &Value, merge: bool) -> VaultResult<ImportResult> {
        let doc = parse_document(doc)?;
        let conn = db.lock()?;

        let mut result = ImportResult::default();
        for prompt in &doc.prompts {
            let incoming = doc.versions_of(&prompt.id);

            match PromptDao::get_by_id(&conn, &prompt.id)? {
                None => {
                    insert_prompt(&conn, prompt, incoming)?;
                    result.imported += 1;
                }
                Some(_) if !merge => {
                    result.skipped += 1;
                }
                Some(local) => {
                    result.merged += merge_prompt(&conn, local, prompt, incoming)?;
                }
            }
        }

        let orphans = doc
            .versions
            .iter()
            .filter(|v| !doc.prompts.iter().any(|p| p.id == v.prompt_id))
            .count();
        if orphans > 0 {
            tracing::warn!(
                "[Import] ignored {} versions with no matching prompt",
                orphans
            );
        }

        tracing::info!(
            "[Import] imported={} skipped={} merged={} (merge={})",
            result.imported,
            result.skipped,
            result.merged,
            merge
        );
        Ok(result)
    }

    pub fn import_json(db: &DbConnection, text: &str, merge: bool) -> VaultResult<ImportResult> {
        let doc: Value = serde_json::from_str(text)
            .map_err(|e| VaultError::InvalidFormat(format!("not valid JSON: {}", e)))?;
        Self::import(db, &doc, merge)
    }
}

/// Checked parse; unknown document versions are accepted with a warning
fn parse_document(doc: &Value) -> VaultResult<ExportDocument> {
    let version = doc.get("version").and_then(Value::as_u64);
    match version {
        Some(v) if v == u64::from(EXPORT_FORMAT_VERSION) => {}
        Some(v) => tracing::warn!("[Import] unexpected document version {}, continuing", v),
        None => tracing::warn!("[Import] document has no version field, continuing"),
    }

    Ok(ExportDocument {
        version: version
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(EXPORT_FORMAT_VERSION),
        exported_at: doc.get("exportedAt").and_then(Value::as_i64).unwrap_or(0),
        prompts: parse_array::<Prompt>(doc, "prompts")?,
        versions: parse_array::<Version>(doc, "versions")?,
    })
}

fn parse_array<T: DeserializeOwned>(doc: &Value, field: &str) -> VaultResult<Vec<T>> {
    let items = doc
        .get(field)
        .ok_or_else(|| VaultError::InvalidFormat(format!("missing `{}`", field)))?
        .as_array()
        .ok_or_else(|| VaultError::InvalidFormat(format!("`{}` is not an array", field)))?;

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            serde_json::from_value::<T>(item.clone())
                .map_err(|e| VaultError::InvalidFormat(format!("{}[{}]: {}", field, idx, e)))
        })
        .collect()
}

fn insert_prompt<'a>(
    conn: &Connection,
    prompt: &Prompt,
    versions: impl Iterator<Item = &'a Version>,
) -> VaultResult<()> {
    let prompt = Prompt {
        tags: normalize_tags(prompt.tags.clone()),
        ..prompt.clone()
    };
    PromptDao::insert(conn, &prompt)?;
    for version in versions {
        if !VersionDao::insert_if_absent(conn, version)? {
            tracing::warn!(
                "[Import] version id {} already used by another prompt, skipped",
                version.id
            );
        }
    }
    Ok(())
}

/// Add missing versions, then take the incoming metadata
///
/// Returns how many versions were added.
fn merge_prompt<'a>(
    conn: &Connection,
    mut local: Prompt,
    incoming: &Prompt,
    versions: impl Iterator<Item = &'a Version>,
) -> VaultResult<usize> {
    let mut added = 0;
    for version in versions {
        if VersionDao::insert_if_absent(conn, version)? {
            added += 1;
        }
    }

    local.title = incoming.title.clone();
    local.description = incoming.description.clone();
    local.tags = normalize_tags(incoming.tags.clone());
    local.archived = incoming.archived;
    local.updated_at = next_timestamp(local.updated_at);
    PromptDao::update(conn, &local)?;

    tracing::debug!("[Import] merged {} (+{} versions)", local.id, added);
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::open_in_memory;
    use crate::models::NewPrompt;
    use crate::services::prompt_service::PromptService;
    use crate::services::version_service::VersionService;
    use serde_json::json;

    fn seeded() -> (DbConnection, String) {
        let db = open_in_memory().unwrap();
        let id = PromptService::create(
            &db,
            NewPrompt {
                title: Some("Greeting".to_string()),
                tags: vec!["mail".to_string()],
                content: Some("Hello".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        VersionService::create_version(&db, &id, "Hello there", None).unwrap();
        (db, id)
    }

    fn export_value(db: &DbConnection) -> Value {
        serde_json::to_value(TransferService::export(db).unwrap()).unwrap()
    }

    #[test]
    fn test_export_includes_archived() {
        let (db, id) = seeded();
        PromptService::delete(&db, &id, false).unwrap();

        let doc = TransferService::export(&db).unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.prompts.len(), 1);
        assert!(doc.prompts[0].archived);
        assert_eq!(doc.versions.len(), 2);

        let json = export_value(&db);
        assert!(json["exportedAt"].is_i64());
        assert!(json["versions"][0]["promptId"].is_string());
    }

    #[test]
    fn test_import_into_empty_store_is_verbatim() {
        let (source, id) = seeded();
        let doc = export_value(&source);

        let target = open_in_memory().unwrap();
        let result = TransferService::import(&target, &doc, false).unwrap();
        assert_eq!(
            result,
            ImportResult {
                imported: 1,
                skipped: 0,
                merged: 0
            }
        );

        let original = PromptService::get(&source, &id).unwrap().unwrap();
        let copied = PromptService::get(&target, &id).unwrap().unwrap();
        assert_eq!(original, copied);
        assert_eq!(
            VersionService::list_versions(&source, &id).unwrap(),
            VersionService::list_versions(&target, &id).unwrap()
        );
    }

    #[test]
    fn test_import_twice_is_idempotent_without_merge() {
        let (db, id) = seeded();
        let before = PromptService::get(&db, &id).unwrap().unwrap();
        let mut doc = export_value(&db);
        doc["prompts"][0]["title"] = json!("Changed elsewhere");
        doc["prompts"][0]["tags"] = json!(["other"]);
        doc["prompts"][0]["archived"] = json!(true);

        let result = TransferService::import(&db, &doc, false).unwrap();
        assert_eq!(result.imported, 0);
        assert_eq!(result.skipped, 1);
        assert_eq!(PromptService::get(&db, &id).unwrap().unwrap(), before);
        assert_eq!(VersionService::list_versions(&db, &id).unwrap().len(), 2);
    }

    #[test]
    fn test_imported_tags_are_normalized() {
        let db = open_in_memory().unwrap();
        let doc = json!({
            "version": 1,
            "prompts": [{
                "id": "p1",
                "title": "T",
                "tags": ["Mail", " Work ", ""],
                "createdAt": 1,
                "updatedAt": 1
            }],
            "versions": []
        });
        TransferService::import(&db, &doc, false).unwrap();

        let found = PromptService::filter_by_tags(&db, &["Mail".to_string()]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tags, vec!["mail", "work"]);
        // Ids and timestamps still come in as written
        assert_eq!(found[0].id, "p1");
        assert_eq!(found[0].created_at, 1);

        let tags = PromptService::get_all_tags(&db).unwrap();
        assert_eq!(
            tags.iter().map(|t| t.tag.as_str()).collect::<Vec<_>>(),
            vec!["mail", "work"]
        );
    }

    #[test]
    fn test_merge_adds_missing_versions_and_overwrites_metadata() {
        let (source, id) = seeded();
        let doc = export_value(&source);

        // Local copy has only the first version and a different title
        let local = open_in_memory().unwrap();
        let mut trimmed = doc.clone();
        trimmed["versions"] = json!([doc["versions"][0].clone()]);
        trimmed["prompts"][0]["title"] = json!("Local title");
        TransferService::import(&local, &trimmed, false).unwrap();
        let before = PromptService::get(&local, &id).unwrap().unwrap();

        let mut incoming = doc.clone();
        incoming["prompts"][0]["tags"] = json!(["Mail", "new"]);
        incoming["prompts"][0]["createdAt"] = json!(1);
        let result = TransferService::import(&local, &incoming, true).unwrap();
        assert_eq!(result.merged, 1);
        assert_eq!(result.imported, 0);
        assert_eq!(result.skipped, 0);

        let after = PromptService::get(&local, &id).unwrap().unwrap();
        assert_eq!(after.title, "Greeting");
        assert_eq!(after.tags, vec!["mail", "new"]);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(VersionService::list_versions(&local, &id).unwrap().len(), 2);

        // Nothing left to add on a second pass
        let again = TransferService::import(&local, &incoming, true).unwrap();
        assert_eq!(again.merged, 0);
    }

    #[test]
    fn test_missing_arrays_are_invalid_before_any_write() {
        let db = open_in_memory().unwrap();
        let prompt = json!({"id": "p1", "title": "T", "createdAt": 1, "updatedAt": 1});

        let err = TransferService::import(&db, &json!({"version": 1, "prompts": [prompt]}), false)
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidFormat(_)));

        let err = TransferService::import(
            &db,
            &json!({"version": 1, "prompts": {}, "versions": []}),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, VaultError::InvalidFormat(_)));

        let err = TransferService::import(
            &db,
            &json!({"version": 1, "prompts": [prompt, {"title": 3}], "versions": []}),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("prompts[1]"));

        let conn = db.lock().unwrap();
        assert_eq!(PromptDao::count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_other_document_version_is_accepted() {
        let db = open_in_memory().unwrap();
        let doc = json!({
            "version": 2,
            "prompts": [{"id": "p1", "title": "T", "createdAt": 1, "updatedAt": 1}],
            "versions": [
                {"id": "v1", "promptId": "p1", "version": "v1", "content": "x",
                 "createdAt": 1, "updatedAt": 1},
                {"id": "v2", "promptId": "ghost", "version": "v1", "content": "y",
                 "createdAt": 1, "updatedAt": 1}
            ]
        });

        let result = TransferService::import(&db, &doc, true).unwrap();
        assert_eq!(result.imported, 1);

        let conn = db.lock().unwrap();
        // Orphan version ignored
        assert_eq!(VersionDao::count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_import_json_round_trip() {
        let (source, _) = seeded();
        let text = TransferService::export_json(&source).unwrap();

        let target = open_in_memory().unwrap();
        let result = TransferService::import_json(&target, &text, false).unwrap();
        assert_eq!(result.imported, 1);

        let err = TransferService::import_json(&target, "{not json", false).unwrap_err();
        assert_eq!(err.error_type(), "invalid_format");
    }
}
