//! promptvault
//!
//! A local library of prompt templates with append-only version history,
//! id-keyed merge import/export, a display line diff and encrypted remote
//! backup. [`PromptVault`] is the entry point.

pub mod app;
pub mod backends;
pub mod config;
pub mod crypto;
pub mod database;
pub mod diff;
pub mod error;
pub mod logger;
pub mod models;
pub mod services;
pub mod validation;

pub use app::PromptVault;
pub use config::{Config, ConfigManager};
pub use error::{VaultError, VaultResult};
