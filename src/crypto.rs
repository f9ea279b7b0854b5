//! 备份加密
//!
//! AES-256-GCM over the backup payload. The key is derived from a passphrase
//! with Argon2 and a per-install salt kept in `settings`; it lives in memory
//! only, between `unlock` and `lock`.

use crate::database::dao::settings::SettingsDao;
use crate::error::{VaultError, VaultResult};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const ALGORITHM: &str = "AES-GCM";
pub const SALT_SETTING_KEY: &str = "encryption_salt";
const SALT_LEN: usize = 16;
const IV_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Encrypted payload as written to a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// Base64 ciphertext with the GCM tag appended
    pub encrypted: String,
    /// Base64 12-byte nonce
    pub iv: String,
    pub algorithm: String,
}

/// Whether `text` looks like an [`EncryptedEnvelope`] rather than a plain export
///
/// An export document never has a top-level `iv` field.
pub fn is_envelope(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.get("iv").map(|iv| iv.is_string()))
        .unwrap_or(false)
}

/// Per-install salt, created on first use
pub fn load_or_create_salt(conn: &Connection) -> VaultResult<Vec<u8>> {
    if let Some(stored) = SettingsDao::get(conn, SALT_SETTING_KEY)? {
        let salt = BASE64
            .decode(stored.trim())
            .map_err(|e| VaultError::Crypto(format!("stored salt is not base64: {}", e)))?;
        if salt.len() == SALT_LEN {
            return Ok(salt);
        }
        return Err(VaultError::Crypto(format!(
            "stored salt has {} bytes, expected {}",
            salt.len(),
            SALT_LEN
        )));
    }

    let mut salt = vec![0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    SettingsDao::set(conn, SALT_SETTING_KEY, &BASE64.encode(&salt))?;
    tracing::info!("[Crypto] generated new encryption salt");
    Ok(salt)
}

#[derive(Default)]
pub struct CryptoService {
    key: Option<[u8; KEY_LEN]>,
}

impl std::fmt::Debug for CryptoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoService")
            .field("unlocked", &self.is_unlocked())
            .finish()
    }
}

impl CryptoService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive_key(passphrase: &str, salt: &[u8]) -> VaultResult<[u8; KEY_LEN]> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| VaultError::Crypto(format!("key derivation failed: {}", e)))?;
        Ok(key)
    }

    /// Derive and hold the key for `passphrase`
    pub fn unlock(&mut self, passphrase: &str, salt: &[u8]) -> VaultResult<()> {
        if passphrase.is_empty() {
            return Err(VaultError::Crypto("passphrase is empty".to_string()));
        }
        self.key = Some(Self::derive_key(passphrase, salt)?);
        tracing::debug!("[Crypto] key unlocked");
        Ok(())
    }

    pub fn lock(&mut self) {
        self.key = None;
    }

    pub fn is_unlocked(&self) -> bool {
        self.key.is_some()
    }

    fn cipher(&self) -> VaultResult<Aes256Gcm> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| VaultError::Crypto("encryption key is locked".to_string()))?;
        Aes256Gcm::new_from_slice(key).map_err(|e| VaultError::Crypto(e.to_string()))
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> VaultResult<EncryptedEnvelope> {
        let cipher = self.cipher()?;
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|_| VaultError::Crypto("encryption failed".to_string()))?;

        Ok(EncryptedEnvelope {
            encrypted: BASE64.encode(ciphertext),
            iv: BASE64.encode(iv),
            algorithm: ALGORITHM.to_string(),
        })
    }

    pub fn decrypt(&self, envelope: &EncryptedEnvelope) -> VaultResult<Vec<u8>> {
        if envelope.algorithm != ALGORITHM {
            return Err(VaultError::Crypto(format!(
                "unsupported algorithm: {}",
                envelope.algorithm
            )));
        }
        let cipher = self.cipher()?;

        let iv = BASE64
            .decode(&envelope.iv)
            .map_err(|e| VaultError::Crypto(format!("iv is not base64: {}", e)))?;
        if iv.len() != IV_LEN {
            return Err(VaultError::Crypto(format!(
                "iv has {} bytes, expected {}",
                iv.len(),
                IV_LEN
            )));
        }
        let ciphertext = BASE64
            .decode(&envelope.encrypted)
            .map_err(|e| VaultError::Crypto(format!("ciphertext is not base64: {}", e)))?;

        // Wrong key and tampered data look the same here
        cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
            .map_err(|_| {
                VaultError::Crypto(
                    "decryption failed: wrong passphrase or corrupted data".to_string(),
                )
            })
    }
}
