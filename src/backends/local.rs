//! 本地目录备份后端
//!
//! Each backup is one file in the directory, named after the backup; the
//! remote id is that file name. Writes go to a temp file first and are renamed
//! into place.

use super::traits::{BackupBackend, BackupError, BackupErrorKind, BackupResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalBackend {
    backup_dir: PathBuf,
    /// Backups untouched for longer are removed after each upload; 0 keeps all
    retention_days: u32,
}

impl LocalBackend {
    pub fn new(backup_dir: PathBuf, retention_days: u32) -> Self {
        Self {
            backup_dir,
            retention_days,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Map a backup name to a path inside the backup dir
    ///
    /// Names that could escape the directory are rejected.
    fn path_for(&self, name: &str) -> BackupResult<PathBuf> {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('.')
            || trimmed.contains('/')
            || trimmed.contains('\\')
        {
            return Err(BackupError::new(
                BackupErrorKind::BadRequest,
                format!("invalid backup name: {:?}", name),
            ));
        }
        Ok(self.backup_dir.join(trimmed))
    }

    /// Backup files in the directory, sorted by name
    pub async fn list_backups(&self) -> BackupResult<Vec<PathBuf>> {
        let mut backups = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(backups),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                backups.push(path);
            }
        }
        backups.sort();
        Ok(backups)
    }

    /// Remove `*.json` backups older than the retention window
    ///
    /// Returns how many files were removed. Files whose metadata cannot be read
    /// are left alone.
    pub async fn cleanup_old_backups(&self) -> BackupResult<usize> {
        if self.retention_days == 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - Duration::days(self.retention_days as i64);

        let mut removed = 0;
        for path in self.list_backups().await? {
            let Ok(metadata) = tokio::fs::metadata(&path).await else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if DateTime::<Utc>::from(modified) < cutoff {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!("[Backup] could not remove {:?}: {}", path, e),
                }
            }
        }
        if removed > 0 {
            tracing::info!("[Backup] removed {} stale local backups", removed);
        }
        Ok(removed)
    }
}

#[async_trait]
impl BackupBackend for LocalBackend {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> BackupResult<String> {
        let target = self.path_for(name)?;
        tokio::fs::create_dir_all(&self.backup_dir).await?;

        let tmp = self.backup_dir.join(format!(".{}.tmp", name.trim()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!("[Backup] wrote {} bytes to {:?}", bytes.len(), target);
        self.cleanup_old_backups().await?;
        Ok(name.trim().to_string())
    }

    async fn download(&self, remote_id: &str) -> BackupResult<Vec<u8>> {
        let path = self.path_for(remote_id)?;
        Ok(tokio::fs::read(&path).await?)
    }

    async fn find(&self, name: &str) -> BackupResult<Option<String>> {
        let path = self.path_for(name)?;
        if tokio::fs::try_exists(&path).await? {
            Ok(Some(name.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_download_find() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path().join("backups"), 30);

        assert_eq!(backend.find("vault.json").await.unwrap(), None);

        let id = backend
            .upload("vault.json", b"{\"version\":1}".to_vec())
            .await
            .unwrap();
        assert_eq!(id, "vault.json");
        assert_eq!(
            backend.find("vault.json").await.unwrap(),
            Some("vault.json".to_string())
        );
        assert_eq!(backend.download(&id).await.unwrap(), b"{\"version\":1}");

        // Overwrite in place, no temp file left behind
        backend.upload("vault.json", b"second".to_vec()).await.unwrap();
        assert_eq!(backend.download(&id).await.unwrap(), b"second");
        let names: Vec<_> = std::fs::read_dir(backend.backup_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["vault.json"]);
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path().to_path_buf(), 30);
        let err = backend.download("nope.json").await.unwrap_err();
        assert_eq!(err.kind, BackupErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path().to_path_buf(), 30);
        for name in ["../evil.json", "a/b.json", ".hidden", ""] {
            let err = backend.upload(name, vec![]).await.unwrap_err();
            assert_eq!(err.kind, BackupErrorKind::BadRequest);
        }
    }

    #[tokio::test]
    async fn test_cleanup_keeps_recent_files() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path().to_path_buf(), 1);
        backend.upload("a.json", b"a".to_vec()).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        assert_eq!(backend.cleanup_old_backups().await.unwrap(), 0);
        assert_eq!(backend.list_backups().await.unwrap().len(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path().join("absent"), 0);
        assert!(backend.list_backups().await.unwrap().is_empty());
        assert_eq!(backend.cleanup_old_backups().await.unwrap(), 0);
    }
}
