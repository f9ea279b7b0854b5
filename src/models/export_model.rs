use serde::{Deserialize, Serialize};

use super::prompt_model::{now_millis, Prompt};
use super::version_model::Version;

/// Schema version written by this build
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Portable dump of every prompt and version, archived included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub exported_at: i64,
    pub prompts: Vec<Prompt>,
    pub versions: Vec<Version>,
}

impl ExportDocument {
    pub fn new(prompts: Vec<Prompt>, versions: Vec<Version>) -> Self {
        Self {
            version: EXPORT_FORMAT_VERSION,
            exported_at: now_millis(),
            prompts,
            versions,
        }
    }

    pub fn versions_of<'a>(&'a self, prompt_id: &'a str) -> impl Iterator<Item = &'a Version> {
        self.versions.iter().filter(move |v| v.prompt_id == prompt_id)
    }
}

/// Counters returned by an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Prompts that did not exist locally
    pub imported: usize,
    /// Existing prompts left untouched (merge disabled)
    pub skipped: usize,
    /// Versions added to existing prompts (merge enabled)
    pub merged: usize,
}
