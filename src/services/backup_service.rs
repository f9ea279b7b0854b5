//! 备份服务
//!
//! Backup is an export pushed to a backend, optionally encrypted first.
//! Restore pulls it back, decrypts when it finds an envelope, and runs the
//! regular import. The database lock is never held across an await.

use crate::backends::BackupBackend;
use crate::crypto::{is_envelope, CryptoService, EncryptedEnvelope};
use crate::database::DbConnection;
use crate::error::{RecordKind, VaultError, VaultResult};
use crate::models::ImportResult;
use crate::services::transfer_service::TransferService;

pub struct BackupService;

impl BackupService {
    /// Export JSON, encrypted to an envelope when `crypto` is given
    pub fn build_payload(
        db: &DbConnection,
        crypto: Option<&CryptoService>,
    ) -> VaultResult<Vec<u8>> {
        let json = TransferService::export_json(db)?;
        match crypto {
            Some(crypto) => {
                let envelope = crypto.encrypt(json.as_bytes())?;
                Ok(serde_json::to_vec(&envelope)?)
            }
            None => Ok(json.into_bytes()),
        }
    }

    /// Turn downloaded bytes back into export JSON
    pub fn open_payload(bytes: &[u8], crypto: Option<&CryptoService>) -> VaultResult<String> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| VaultError::InvalidFormat("backup is not UTF-8 text".to_string()))?;
        if !is_envelope(text) {
            return Ok(text.to_string());
        }

        let crypto = crypto.ok_or_else(|| {
            VaultError::Crypto("backup is encrypted but no key is available".to_string())
        })?;
        let envelope: EncryptedEnvelope = serde_json::from_str(text)
            .map_err(|e| VaultError::Crypto(format!("malformed envelope: {}", e)))?;
        let plain = crypto.decrypt(&envelope)?;
        String::from_utf8(plain)
            .map_err(|_| VaultError::Crypto("decrypted backup is not UTF-8 text".to_string()))
    }

    /// Upload the current store under `name`; returns the remote id
    pub async fn backup(
        db: &DbConnection,
        backend: &dyn BackupBackend,
        crypto: Option<&CryptoService>,
        name: &str,
    ) -> VaultResult<String> {
        let payload = Self::build_payload(db, crypto)?;
        let size = payload.len();
        let remote_id = backend.upload(name, payload).await?;
        tracing::info!(
            "[Backup] {} bytes to {} as {} (encrypted={})",
            size,
            backend.kind(),
            remote_id,
            crypto.is_some()
        );
        Ok(remote_id)
    }

    /// Download the backup stored under `name` and import it
    pub async fn restore(
        db: &DbConnection,
        backend: &dyn BackupBackend,
        crypto: Option<&CryptoService>,
        name: &str,
        merge: bool,
    ) -> VaultResult<ImportResult> {
        let remote_id = backend
            .find(name)
            .await?
            .ok_or_else(|| VaultError::NotFound {
                kind: RecordKind::Backup,
                id: name.to_string(),
            })?;
        let bytes = backend.download(&remote_id).await?;
        let json = Self::open_payload(&bytes, crypto)?;

        let result = TransferService::import_json(db, &json, merge)?;
        tracing::info!(
            "[Backup] restored {} from {}: imported={} skipped={} merged={}",
            remote_id,
            backend.kind(),
            result.imported,
            result.skipped,
            result.merged
        );
        Ok(result)
    }
}
