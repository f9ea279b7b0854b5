//! 备份后端层
//!
//! Where backup payloads go. The layer only moves bytes: payload building,
//! encryption and import live in `services::backup_service`.
//!
//! ```text
//! backends/
//! ├── traits.rs          # BackupBackend trait + BackupError
//! ├── local.rs           # directory on disk
//! ├── object_backup.rs   # Drive style app-data files
//! └── document_sync.rs   # Firestore style documents
//! ```

pub mod document_sync;
pub mod local;
pub mod object_backup;
pub mod traits;

pub use document_sync::DocumentSyncBackend;
pub use local::LocalBackend;
pub use object_backup::ObjectBackupBackend;
pub use traits::{BackupBackend, BackupError, BackupErrorKind, BackupResult};

use crate::config::{expand_tilde, BackendConfig};
use crate::logger::sanitize_log_message;
use reqwest::{Client, Response};
use std::time::Duration;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Build the backend named by the configuration
pub fn create_backend(config: &BackendConfig) -> BackupResult<Box<dyn BackupBackend>> {
    let backend: Box<dyn BackupBackend> = match config {
        BackendConfig::Local {
            dir,
            retention_days,
        } => Box::new(LocalBackend::new(expand_tilde(dir), *retention_days)),
        BackendConfig::ObjectBackup {
            api_base,
            upload_base,
            access_token,
        } => Box::new(ObjectBackupBackend::new(
            api_base.as_str(),
            upload_base.as_str(),
            access_token.as_str(),
        )?),
        BackendConfig::DocumentSync {
            api_base,
            project_id,
            collection,
            access_token,
        } => Box::new(DocumentSyncBackend::new(
            api_base.as_str(),
            project_id.as_str(),
            collection.as_str(),
            access_token.as_str(),
        )?),
    };
    tracing::debug!("[Backup] using {} backend", backend.kind());
    Ok(backend)
}

pub(crate) fn http_client() -> BackupResult<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?)
}

/// Pass a successful response through; turn anything else into a [`BackupError`]
///
/// The response body is sanitized before it is logged or kept in the error.
pub(crate) async fn check_response(resp: Response, action: &str) -> BackupResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let body = sanitize_log_message(&body);
    tracing::error!("[Backup] {} failed: {} - {}", action, status, body);
    Err(BackupError::from_status(
        status.as_u16(),
        format!("{} failed: {}", action, body),
    ))
}
