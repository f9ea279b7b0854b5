//! 业务服务层
//!
//! Unit structs over a [`DbConnection`](crate::database::DbConnection). Each
//! public call takes the lock once; `*_with_conn` variants compose under an
//! already held lock.

pub mod backup_service;
pub mod prompt_service;
pub mod transfer_service;
pub mod version_service;

pub use backup_service::BackupService;
pub use prompt_service::PromptService;
pub use transfer_service::TransferService;
pub use version_service::VersionService;
