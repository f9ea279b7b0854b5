//! Error types
//!
//! Every failure surfaced by the store, the versioning service, the merge
//! engine and the backup layer funnels into [`VaultError`].

use crate::backends::BackupError;
use crate::config::ConfigError;
use crate::validation::ValidationError;
use thiserror::Error;

/// Result alias used by the service layer
pub type VaultResult<T> = Result<T, VaultError>;

/// Kind of record a lookup failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Prompt,
    Version,
    Backup,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Prompt => write!(f, "prompt"),
            RecordKind::Version => write!(f, "version"),
            RecordKind::Backup => write!(f, "backup"),
        }
    }
}

#[derive(Error, Debug)]
pub enum VaultError {
    /// Referenced id is absent from storage
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// Import document is missing required arrays or carries malformed records
    #[error("invalid import format: {0}")]
    InvalidFormat(String),

    /// Field constraint violated; the write was not attempted
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Remote backup collaborator failed (network, auth, quota, integrity)
    #[error("remote backup error: {0}")]
    Remote(#[from] BackupError),

    /// Key missing, envelope malformed or authentication tag mismatch
    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database mutex poisoned by a panicking holder
    #[error("database lock poisoned: {0}")]
    Lock(String),
}

impl VaultError {
    pub fn prompt_not_found(id: impl Into<String>) -> Self {
        VaultError::NotFound {
            kind: RecordKind::Prompt,
            id: id.into(),
        }
    }

    pub fn version_not_found(id: impl Into<String>) -> Self {
        VaultError::NotFound {
            kind: RecordKind::Version,
            id: id.into(),
        }
    }

    /// Stable tag for callers that branch on the error category
    pub fn error_type(&self) -> &'static str {
        match self {
            VaultError::NotFound { .. } => "not_found",
            VaultError::InvalidFormat(_) => "invalid_format",
            VaultError::Validation(_) => "validation_error",
            VaultError::Remote(_) => "remote_error",
            VaultError::Crypto(_) => "crypto_error",
            VaultError::Database(_) => "database_error",
            VaultError::Serialization(_) => "serialization_error",
            VaultError::Io(_) => "io_error",
            VaultError::Config(_) => "config_error",
            VaultError::Lock(_) => "lock_error",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::NotFound { .. })
    }
}

impl<T> From<std::sync::PoisonError<T>> for VaultError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        VaultError::Lock(err.to_string())
    }
}
