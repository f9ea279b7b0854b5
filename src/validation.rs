//! 字段校验
//!
//! Constraint checks run before a write when `validation.enabled` is set.

use crate::models::{normalize_tags, NewPrompt, PromptPatch, COLLECTION_PREFIX};
use thiserror::Error;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_CONTENT_CHARS: usize = 100_000;
pub const MAX_TAG_CHARS: usize = 50;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("title exceeds {max} characters ({actual})")]
    TitleTooLong { max: usize, actual: usize },

    #[error("description exceeds {max} characters ({actual})")]
    DescriptionTooLong { max: usize, actual: usize },

    #[error("content exceeds {max} characters ({actual})")]
    ContentTooLong { max: usize, actual: usize },

    #[error("invalid tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: &'static str },
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let actual = title.chars().count();
    if actual > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong {
            max: MAX_TITLE_CHARS,
            actual,
        });
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    let actual = description.chars().count();
    if actual > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::DescriptionTooLong {
            max: MAX_DESCRIPTION_CHARS,
            actual,
        });
    }
    Ok(())
}

pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    let actual = content.chars().count();
    if actual > MAX_CONTENT_CHARS {
        return Err(ValidationError::ContentTooLong {
            max: MAX_CONTENT_CHARS,
            actual,
        });
    }
    Ok(())
}

/// Checks an already normalized tag (trimmed, lowercase)
pub fn validate_tag(tag: &str) -> Result<(), ValidationError> {
    let invalid = |reason| ValidationError::InvalidTag {
        tag: tag.to_string(),
        reason,
    };

    if tag.is_empty() {
        return Err(invalid("empty"));
    }
    if tag.chars().count() > MAX_TAG_CHARS {
        return Err(invalid("too long"));
    }
    if tag.chars().any(|c| c.is_whitespace() || c == ',') {
        return Err(invalid("contains whitespace or comma"));
    }
    if tag.chars().any(|c| c.is_uppercase()) {
        return Err(invalid("not lowercase"));
    }
    if let Some(name) = tag.strip_prefix(COLLECTION_PREFIX) {
        if name.is_empty() {
            return Err(invalid("collection name missing"));
        }
    }
    Ok(())
}

/// Checks tags in the form they will be stored, after normalization
pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    normalize_tags(tags.to_vec())
        .iter()
        .try_for_each(|t| validate_tag(t))
}

/// Validate a creation request. A missing title is allowed (placeholder applies).
pub fn validate_new_prompt(input: &NewPrompt) -> Result<(), ValidationError> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    if let Some(description) = &input.description {
        validate_description(description)?;
    }
    if let Some(content) = &input.content {
        validate_content(content)?;
    }
    validate_tags(&input.tags)
}

pub fn validate_patch(patch: &PromptPatch) -> Result<(), ValidationError> {
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }
    if let Some(Some(description)) = &patch.description {
        validate_description(description)?;
    }
    if let Some(tags) = &patch.tags {
        validate_tags(tags)?;
    }
    Ok(())
}
