pub mod export_model;
pub mod prompt_model;
pub mod version_model;

pub use export_model::{ExportDocument, ImportResult, EXPORT_FORMAT_VERSION};
pub use prompt_model::{
    collection_name, collection_tag, normalize_tag, normalize_tags, now_millis, NewPrompt, Prompt,
    PromptFilter, PromptPatch, SortBy, TagCount, COLLECTION_PREFIX, PLACEHOLDER_TITLE,
};
pub use version_model::{version_label, Version, VersionEntry};
