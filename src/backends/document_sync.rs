//! 文档数据库备份后端
//!
//! Firestore style REST documents. One document per backup name, holding the
//! payload as a string field next to its SHA-256 checksum. The checksum is
//! checked on every download.

use super::traits::{BackupBackend, BackupError, BackupErrorKind, BackupResult};
use super::{check_response, http_client};
use crate::models::now_millis;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValue {
    string_value: Option<String>,
}

pub struct DocumentSyncBackend {
    client: Client,
    api_base: String,
    project_id: String,
    collection: String,
    access_token: String,
}

pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl DocumentSyncBackend {
    pub fn new(
        api_base: impl Into<String>,
        project_id: impl Into<String>,
        collection: impl Into<String>,
        access_token: impl Into<String>,
    ) -> BackupResult<Self> {
        Ok(Self {
            client: http_client()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            collection: collection.into(),
            access_token: access_token.into(),
        })
    }

    /// Document ids cannot contain `/`
    fn document_id(name: &str) -> BackupResult<String> {
        let id = name.trim();
        if id.is_empty() || id.contains('/') || id == "." || id == ".." {
            return Err(BackupError::new(
                BackupErrorKind::BadRequest,
                format!("invalid document name: {:?}", name),
            ));
        }
        Ok(id.to_string())
    }

    fn document_url(&self, doc_id: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}",
            self.api_base,
            urlencoding::encode(&self.project_id),
            urlencoding::encode(&self.collection),
            urlencoding::encode(doc_id)
        )
    }

    async fn get_document(&self, doc_id: &str) -> BackupResult<Option<Document>> {
        let resp = self
            .client
            .get(self.document_url(doc_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc = check_response(resp, "get document")
            .await?
            .json::<Document>()
            .await
            .map_err(|e| BackupError::new(BackupErrorKind::Integrity, e.to_string()))?;
        Ok(Some(doc))
    }
}

fn string_field<'a>(doc: &'a Document, name: &str) -> BackupResult<&'a str> {
    doc.fields
        .get(name)
        .and_then(|f| f.string_value.as_deref())
        .ok_or_else(|| {
            BackupError::new(
                BackupErrorKind::Integrity,
                format!("document has no `{}` string field", name),
            )
        })
}

#[async_trait]
impl BackupBackend for DocumentSyncBackend {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> BackupResult<String> {
        let doc_id = Self::document_id(name)?;
        let payload = String::from_utf8(bytes).map_err(|_| {
            BackupError::new(BackupErrorKind::BadRequest, "payload is not UTF-8 text")
        })?;

        let body = json!({
            "fields": {
                "payload": { "stringValue": payload },
                "checksum": { "stringValue": checksum(payload.as_bytes()) },
                "updatedAt": { "integerValue": now_millis().to_string() },
            }
        });

        // PATCH on a document path creates or replaces it
        let resp = self
            .client
            .patch(self.document_url(&doc_id))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        check_response(resp, "write document").await?;

        tracing::info!(
            "[Backup] wrote document {}/{} ({} bytes)",
            self.collection,
            doc_id,
            payload.len()
        );
        Ok(doc_id)
    }

    async fn download(&self, remote_id: &str) -> BackupResult<Vec<u8>> {
        let doc_id = Self::document_id(remote_id)?;
        let doc = self.get_document(&doc_id).await?.ok_or_else(|| {
            BackupError::with_status(
                BackupErrorKind::NotFound,
                format!("document {} not found", doc_id),
                404,
            )
        })?;

        let payload = string_field(&doc, "payload")?;
        let expected = string_field(&doc, "checksum")?;
        let actual = checksum(payload.as_bytes());
        if !actual.eq_ignore_ascii_case(expected) {
            tracing::error!(
                "[Backup] checksum mismatch on {}: expected {}, got {}",
                doc_id,
                expected,
                actual
            );
            return Err(BackupError::new(
                BackupErrorKind::Integrity,
                format!("checksum mismatch for document {}", doc_id),
            ));
        }
        Ok(payload.as_bytes().to_vec())
    }

    async fn find(&self, name: &str) -> BackupResult<Option<String>> {
        let doc_id = Self::document_id(name)?;
        Ok(self.get_document(&doc_id).await?.map(|_| doc_id))
    }

    fn kind(&self) -> &'static str {
        "document_sync"
    }
}
