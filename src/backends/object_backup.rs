//! 对象存储备份后端
//!
//! Google Drive style app-data files. Lookup is by file name inside the
//! hidden `appDataFolder` space; an existing file is overwritten in place so
//! a name maps to one remote id for the life of the backup.

use super::traits::{BackupBackend, BackupError, BackupErrorKind, BackupResult};
use super::{check_response, http_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const APP_DATA_SPACE: &str = "appDataFolder";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

pub struct ObjectBackupBackend {
    client: Client,
    api_base: String,
    upload_base: String,
    access_token: String,
}

impl ObjectBackupBackend {
    pub fn new(
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
        access_token: impl Into<String>,
    ) -> BackupResult<Self> {
        Ok(Self {
            client: http_client()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    async fn create(&self, name: &str, bytes: Vec<u8>) -> BackupResult<String> {
        let boundary = format!("promptvault-{}", uuid::Uuid::new_v4().simple());
        let metadata = serde_json::json!({
            "name": name,
            "parents": [APP_DATA_SPACE],
        });
        let body = multipart_related(&boundary, &metadata.to_string(), &bytes);

        let url = format!("{}/files?uploadType=multipart&fields=id", self.upload_base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;
        let file: FileRef = check_response(resp, "create").await?.json().await?;
        tracing::info!("[Backup] created remote file {}", file.id);
        Ok(file.id)
    }

    async fn overwrite(&self, file_id: &str, bytes: Vec<u8>) -> BackupResult<String> {
        let url = format!(
            "{}/files/{}?uploadType=media&fields=id",
            self.upload_base,
            urlencoding::encode(file_id)
        );
        let resp = self
            .client
            .patch(&url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(bytes)
            .send()
            .await?;
        let file: FileRef = check_response(resp, "update").await?.json().await?;
        tracing::info!("[Backup] updated remote file {}", file.id);
        Ok(file.id)
    }
}

/// Two-part `multipart/related` body: JSON metadata, then the file content
fn multipart_related(boundary: &str, metadata: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// Drive query literal: single quotes and backslashes escaped
fn query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl BackupBackend for ObjectBackupBackend {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> BackupResult<String> {
        match self.find(name).await? {
            Some(id) => self.overwrite(&id, bytes).await,
            None => self.create(name, bytes).await,
        }
    }

    async fn download(&self, remote_id: &str) -> BackupResult<Vec<u8>> {
        let url = format!(
            "{}/files/{}?alt=media",
            self.api_base,
            urlencoding::encode(remote_id)
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let bytes = check_response(resp, "download").await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn find(&self, name: &str) -> BackupResult<Option<String>> {
        let q = format!("name = '{}' and trashed = false", query_literal(name));
        let url = format!(
            "{}/files?spaces={}&fields=files(id,name)&q={}",
            self.api_base,
            APP_DATA_SPACE,
            urlencoding::encode(&q)
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let list: FileList = check_response(resp, "find")
            .await?
            .json()
            .await
            .map_err(|e| BackupError::new(BackupErrorKind::BadRequest, e.to_string()))?;

        if list.files.len() > 1 {
            tracing::warn!(
                "[Backup] {} remote files named {}, using the first",
                list.files.len(),
                name
            );
        }
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    fn kind(&self) -> &'static str {
        "object_backup"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn backend(server: &Server) -> ObjectBackupBackend {
        ObjectBackupBackend::new(
            server.url(),
            format!("{}/upload", server.url()),
            "test-token",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_find_queries_app_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/files")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("spaces".into(), "appDataFolder".into()),
                Matcher::UrlEncoded(
                    "q".into(),
                    "name = 'vault.json' and trashed = false".into(),
                ),
            ]))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(r#"{"files":[{"id":"file-1","name":"vault.json"}]}"#)
            .create_async()
            .await;

        let id = backend(&server).find("vault.json").await.unwrap();
        assert_eq!(id, Some("file-1".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_creates_when_missing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"files":[]}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/upload/files")
            .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/related; boundary=".to_string()),
            )
            .match_body(Matcher::Regex(r#""parents":\["appDataFolder"\]"#.to_string()))
            .with_status(200)
            .with_body(r#"{"id":"new-file"}"#)
            .create_async()
            .await;

        let id = backend(&server)
            .upload("vault.json", b"{\"version\":1}".to_vec())
            .await
            .unwrap();
        assert_eq!(id, "new-file");
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_overwrites_existing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"files":[{"id":"file-1"}]}"#)
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/upload/files/file-1")
            .match_query(Matcher::UrlEncoded("uploadType".into(), "media".into()))
            .match_body("payload")
            .with_status(200)
            .with_body(r#"{"id":"file-1"}"#)
            .create_async()
            .await;

        let id = backend(&server)
            .upload("vault.json", b"payload".to_vec())
            .await
            .unwrap();
        assert_eq!(id, "file-1");
        patch.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_uses_alt_media() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files/file-1")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(200)
            .with_body("backup bytes")
            .create_async()
            .await;

        let bytes = backend(&server).download("file-1").await.unwrap();
        assert_eq!(bytes, b"backup bytes");
    }

    #[tokio::test]
    async fn test_status_errors_are_classified() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files/file-1")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error":"invalid access_token=abc123"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/files/gone")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let b = backend(&server);
        let err = b.download("file-1").await.unwrap_err();
        assert_eq!(err.kind, BackupErrorKind::AuthenticationError);
        assert_eq!(err.status_code, Some(401));
        assert!(!err.message.contains("abc123"));

        let err = b.download("gone").await.unwrap_err();
        assert_eq!(err.kind, BackupErrorKind::NotFound);
    }

    #[test]
    fn test_multipart_layout() {
        let body = multipart_related("b", r#"{"name":"x"}"#, b"data");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--b\r\n"));
        assert!(text.contains("\r\n\r\n{\"name\":\"x\"}\r\n--b\r\n"));
        assert!(text.ends_with("\r\ndata\r\n--b--\r\n"));
    }

    #[test]
    fn test_query_literal_escapes_quotes() {
        assert_eq!(query_literal("it's"), "it\\'s");
    }
}
