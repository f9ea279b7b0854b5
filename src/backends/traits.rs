//! 备份后端 Trait 定义
//!
//! One contract for every backup destination: store a named blob, fetch it
//! back by remote id, look a name up. No retries happen at this layer.

use async_trait::async_trait;

/// 备份调用结果
pub type BackupResult<T> = Result<T, BackupError>;

/// 备份错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupError {
    pub kind: BackupErrorKind,
    pub message: String,
    /// HTTP status when the failure came from a response
    pub status_code: Option<u16>,
}

impl std::fmt::Display for BackupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(code) = self.status_code {
            write!(f, "{} ({}): {}", self.kind, code, self.message)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for BackupError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupErrorKind {
    AuthenticationError,
    NetworkError,
    NotFound,
    QuotaExceeded,
    ServerError,
    BadRequest,
    /// Payload checksum or shape did not match
    Integrity,
    Storage,
    Other,
}

impl std::fmt::Display for BackupErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationError => write!(f, "AuthenticationError"),
            Self::NetworkError => write!(f, "NetworkError"),
            Self::NotFound => write!(f, "NotFound"),
            Self::QuotaExceeded => write!(f, "QuotaExceeded"),
            Self::ServerError => write!(f, "ServerError"),
            Self::BadRequest => write!(f, "BadRequest"),
            Self::Integrity => write!(f, "Integrity"),
            Self::Storage => write!(f, "Storage"),
            Self::Other => write!(f, "Other"),
        }
    }
}

impl BackupError {
    pub fn new(kind: BackupErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(kind: BackupErrorKind, message: impl Into<String>, status: u16) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: Some(status),
        }
    }

    /// 从 HTTP 状态码推断错误类型
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => BackupErrorKind::AuthenticationError,
            404 => BackupErrorKind::NotFound,
            400 | 409 | 422 => BackupErrorKind::BadRequest,
            413 | 429 | 507 => BackupErrorKind::QuotaExceeded,
            500..=599 => BackupErrorKind::ServerError,
            _ => BackupErrorKind::Other,
        };
        Self::with_status(kind, message, status)
    }

    /// Whether an external caller could reasonably try again later
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            BackupErrorKind::NetworkError
                | BackupErrorKind::ServerError
                | BackupErrorKind::QuotaExceeded
        )
    }
}

impl From<reqwest::Error> for BackupError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None => Self::new(BackupErrorKind::NetworkError, err.to_string()),
        }
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            BackupErrorKind::NotFound
        } else {
            BackupErrorKind::Storage
        };
        Self::new(kind, err.to_string())
    }
}

/// 备份后端 Trait
#[async_trait]
pub trait BackupBackend: Send + Sync {
    /// Store `bytes` under `name`, replacing an existing entry of that name
    ///
    /// Returns the remote id to download it with.
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> BackupResult<String>;

    async fn download(&self, remote_id: &str) -> BackupResult<Vec<u8>>;

    /// Remote id of the entry stored under `name`, if any
    async fn find(&self, name: &str) -> BackupResult<Option<String>>;

    /// Short backend tag used in logs
    fn kind(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_error_display() {
        let err = BackupError::new(BackupErrorKind::NetworkError, "connection refused");
        assert_eq!(format!("{}", err), "NetworkError: connection refused");

        let err = BackupError::with_status(BackupErrorKind::ServerError, "internal error", 500);
        assert_eq!(format!("{}", err), "ServerError (500): internal error");
    }

    #[test]
    fn test_backup_error_from_status() {
        let err = BackupError::from_status(401, "unauthorized");
        assert_eq!(err.kind, BackupErrorKind::AuthenticationError);
        assert_eq!(err.status_code, Some(401));

        assert_eq!(
            BackupError::from_status(404, "gone").kind,
            BackupErrorKind::NotFound
        );
        assert_eq!(
            BackupError::from_status(507, "full").kind,
            BackupErrorKind::QuotaExceeded
        );
        assert_eq!(
            BackupError::from_status(503, "unavailable").kind,
            BackupErrorKind::ServerError
        );
    }

    #[test]
    fn test_backup_error_transient() {
        assert!(BackupError::new(BackupErrorKind::NetworkError, "").is_transient());
        assert!(BackupError::new(BackupErrorKind::ServerError, "").is_transient());
        assert!(!BackupError::new(BackupErrorKind::AuthenticationError, "").is_transient());
        assert!(!BackupError::new(BackupErrorKind::Integrity, "").is_transient());
    }

    #[test]
    fn test_io_error_mapping() {
        let err: BackupError = std::io::Error::new(std::io::ErrorKind::NotFound, "nope").into();
        assert_eq!(err.kind, BackupErrorKind::NotFound);
        let err: BackupError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.kind, BackupErrorKind::Storage);
    }
}
