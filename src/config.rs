//! 配置管理
//!
//! YAML configuration at `~/.promptvault/config.yaml`. Every section has
//! defaults so a missing or partial file still yields a usable config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_DATA_DIR: &str = "~/.promptvault";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for the database, logs and local backups; `~` is expanded
    pub data_dir: String,
    pub database_file: String,
    pub logging: LoggingConfig,
    pub validation: ValidationConfig,
    pub backup: BackupConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            database_file: "promptvault.db".to_string(),
            logging: LoggingConfig::default(),
            validation: ValidationConfig::default(),
            backup: BackupConfig::default(),
        }
    }
}

impl Config {
    pub fn data_dir_path(&self) -> PathBuf {
        expand_tilde(&self.data_dir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir_path().join(&self.database_file)
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.data_dir_path().join("logs").join(&self.logging.file_name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_file.trim().is_empty() {
            return Err(ConfigError::Invalid("database_file is empty".to_string()));
        }
        if self.backup.file_name.trim().is_empty() {
            return Err(ConfigError::Invalid("backup.file_name is empty".to_string()));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level: {}",
                self.logging.level
            )));
        }
        self.backup.backend.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Mirror log output into a file under `<data_dir>/logs`
    pub enabled: bool,
    pub level: String,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
            file_name: "promptvault.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject writes that violate field constraints
    pub enabled: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Name the backup is stored under on the remote side
    pub file_name: String,
    /// Encrypt the payload; backing up then needs an unlocked key
    pub encrypt: bool,
    /// Merge flag used when restoring
    pub merge_on_restore: bool,
    pub backend: BackendConfig,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            file_name: "promptvault-backup.json".to_string(),
            encrypt: false,
            merge_on_restore: true,
            backend: BackendConfig::default(),
        }
    }
}

/// Backup destination, chosen once at configuration time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    Local {
        dir: String,
        #[serde(default = "default_retention_days")]
        retention_days: u32,
    },
    ObjectBackup {
        #[serde(default = "default_drive_api_base")]
        api_base: String,
        #[serde(default = "default_drive_upload_base")]
        upload_base: String,
        access_token: String,
    },
    DocumentSync {
        #[serde(default = "default_firestore_api_base")]
        api_base: String,
        project_id: String,
        #[serde(default = "default_collection")]
        collection: String,
        access_token: String,
    },
}

fn default_retention_days() -> u32 {
    30
}

fn default_drive_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_drive_upload_base() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_firestore_api_base() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_collection() -> String {
    "promptvault_backups".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local {
            dir: format!("{DEFAULT_DATA_DIR}/backups"),
            retention_days: default_retention_days(),
        }
    }
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Local { .. } => "local",
            BackendConfig::ObjectBackup { .. } => "object_backup",
            BackendConfig::DocumentSync { .. } => "document_sync",
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            BackendConfig::Local { dir, .. } if dir.trim().is_empty() => Err(
                ConfigError::Invalid("local backup dir is empty".to_string()),
            ),
            BackendConfig::ObjectBackup { access_token, .. }
            | BackendConfig::DocumentSync { access_token, .. }
                if access_token.trim().is_empty() =>
            {
                Err(ConfigError::Invalid(format!(
                    "{} backend requires an access_token",
                    self.kind()
                )))
            }
            BackendConfig::DocumentSync { project_id, .. } if project_id.trim().is_empty() => Err(
                ConfigError::Invalid("document_sync backend requires a project_id".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn default_config_path() -> PathBuf {
    expand_tilde(DEFAULT_DATA_DIR).join(CONFIG_FILE_NAME)
}

/// Owns the loaded config and the path it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Config,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Config::default()
            } else {
                serde_yaml::from_str(&content)?
            }
        } else {
            tracing::debug!("[Config] {:?} not found, using defaults", path);
            Config::default()
        };
        config.validate()?;

        Ok(Self {
            config,
            config_path: path.to_path_buf(),
        })
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&default_config_path())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(&self.config)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
