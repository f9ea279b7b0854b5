//! 日志管理模块
//!
//! Installs the global `tracing` subscriber: stderr always, plus an append-only
//! file under the data dir when file logging is enabled. The file is rotated
//! at startup once it grows past [`MAX_LOG_FILE_SIZE`].

use crate::config::Config;
use chrono::{Duration, Local, Utc};
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;
/// Rotated log files older than this are deleted
pub const ROTATED_RETENTION_DAYS: i64 = 7;

/// Install the global subscriber
///
/// Returns `false` when a subscriber was already installed, which is normal in
/// tests and when embedding.
pub fn init_logging(config: &Config) -> std::io::Result<bool> {
    let level: LevelFilter = config.logging.level.parse().unwrap_or(LevelFilter::INFO);

    let file_layer = if config.logging.enabled {
        let path = config.log_file_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        rotate_log_file_if_needed(&path);
        prune_rotated_logs(&path);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(level)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            "[Logger] level={} file_logging={}",
            level,
            config.logging.enabled
        );
    }
    Ok(installed)
}

fn rotate_log_file_if_needed(path: &Path) {
    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    if metadata.len() <= MAX_LOG_FILE_SIZE {
        return;
    }

    let suffix = Local::now().format("%Y%m%d-%H%M%S");
    let rotated = path.with_file_name(format!(
        "{}.{}",
        path.file_name().unwrap_or_default().to_string_lossy(),
        suffix
    ));
    let _ = fs::rename(path, rotated);
}

/// Delete `<file>.<suffix>` siblings past the retention window
fn prune_rotated_logs(path: &Path) -> usize {
    let Some(dir) = path.parent() else {
        return 0;
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let cutoff = Utc::now() - Duration::days(ROTATED_RETENTION_DAYS);
    let prefix = format!(
        "{}.",
        path.file_name().unwrap_or_default().to_string_lossy()
    );

    let mut removed = 0;
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        if !file_name.to_string_lossy().starts_with(&prefix) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if chrono::DateTime::<Utc>::from(modified) < cutoff && fs::remove_file(entry.path()).is_ok()
        {
            removed += 1;
        }
    }
    removed
}

/// Redact credentials before a message reaches a log sink
///
/// Applied to remote response bodies, which can echo tokens back.
pub fn sanitize_log_message(message: &str) -> String {
    let patterns = [
        // Bearer token
        (r"Bearer\s+[A-Za-z0-9._-]+", "Bearer ***"),
        (
            r#"api[_-]?key["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "api_key: ***",
        ),
        (r#"token["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#, "token: ***"),
        (
            r#"access[_-]?token["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "access_token: ***",
        ),
        (
            r#"refresh[_-]?token["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "refresh_token: ***",
        ),
        (
            r#"client[_-]?secret["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "client_secret: ***",
        ),
        (
            r#"[Aa]uthorization["']?\s*[:=]\s*["']?[A-Za-z0-9._\s-]+"#,
            "authorization: ***",
        ),
        (r#"password["']?\s*[:=]\s*["']?[^\s"',}]+"#, "password: ***"),
        (r#"passphrase["']?\s*[:=]\s*["']?[^\s"',}]+"#, "passphrase: ***"),
        (
            r#"secret["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "secret: ***",
        ),
    ];

    let mut sanitized = message.to_string();
    for (pattern, replacement) in patterns {
        if let Ok(re) = Regex::new(pattern) {
            sanitized = re.replace_all(&sanitized, replacement).to_string();
        }
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_bearer_token() {
        let input = "Authorization: Bearer abcDEF123._-XYZ";
        let output = sanitize_log_message(input);
        assert!(!output.contains("abcDEF123"));
        assert!(output.contains("***"));
    }

    #[test]
    fn test_sanitize_api_key() {
        let input = r#"request api_key="sk-test_123.456-ABC" end"#;
        let output = sanitize_log_message(input);
        assert!(output.contains("api_key: ***"));
        assert!(!output.contains("sk-test_123"));
    }

    #[test]
    fn test_sanitize_access_token() {
        let input = r#"{"error":"invalid access_token=ya29_12345"}"#;
        let output = sanitize_log_message(input);
        assert!(!output.contains("ya29_12345"));
    }

    #[test]
    fn test_sanitize_password_and_passphrase() {
        let output = sanitize_log_message(r#"{"password":"p@ssW0rd!"}"#);
        assert!(output.contains("password: ***"));
        assert!(!output.contains("p@ssW0rd!"));

        let output = sanitize_log_message("passphrase=correct-horse");
        assert!(output.contains("passphrase: ***"));
        assert!(!output.contains("correct-horse"));
    }

    #[test]
    fn test_plain_text_unchanged() {
        let input = "[Import] imported=2 skipped=0 merged=3";
        assert_eq!(sanitize_log_message(input), input);
    }

    #[test]
    fn test_rotate_only_large_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("promptvault.log");
        fs::write(&path, "small").unwrap();
        rotate_log_file_if_needed(&path);
        assert!(path.exists());

        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_LOG_FILE_SIZE + 1).unwrap();
        rotate_log_file_if_needed(&path);
        assert!(!path.exists());
        let rotated = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(rotated, 1);
    }

    #[test]
    fn test_prune_keeps_recent_rotations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("promptvault.log");
        fs::write(dir.path().join("promptvault.log.20240101-000000"), "old").unwrap();
        fs::write(dir.path().join("other.txt"), "x").unwrap();
        assert_eq!(prune_rotated_logs(&path), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_init_logging_creates_log_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = dir.path().to_string_lossy().to_string();
        config.logging.enabled = true;

        init_logging(&config).unwrap();
        assert!(config.log_file_path().exists());
    }
}
