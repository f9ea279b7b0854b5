use serde::{Deserialize, Serialize};

/// Tags with this prefix group prompts into a collection
pub const COLLECTION_PREFIX: &str = "collection:";

/// Title used when a prompt is created without one
pub const PLACEHOLDER_TITLE: &str = "Untitled Prompt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Soft-delete flag
    #[serde(default)]
    pub archived: bool,
    /// Epoch milliseconds
    pub created_at: i64,
    /// Epoch milliseconds; advances on every mutation and every new version
    pub updated_at: i64,
}

impl Prompt {
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Collection names this prompt belongs to, in tag order
    pub fn collections(&self) -> Vec<&str> {
        self.tags.iter().filter_map(|t| collection_name(t)).collect()
    }
}

/// Creation request; absent fields fall back to defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrompt {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// When present, becomes version 1
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; `None` leaves a field untouched
///
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub archived: Option<bool>,
}

impl PromptPatch {
    pub fn archived(archived: bool) -> Self {
        Self {
            archived: Some(archived),
            ..Default::default()
        }
    }

    pub fn tags(tags: Vec<String>) -> Self {
        Self {
            tags: Some(tags),
            ..Default::default()
        }
    }

    /// Apply onto a record; the caller refreshes `updated_at`
    pub fn apply(self, prompt: &mut Prompt) {
        if let Some(title) = self.title {
            prompt.title = title;
        }
        if let Some(description) = self.description {
            prompt.description = description;
        }
        if let Some(tags) = self.tags {
            prompt.tags = normalize_tags(tags);
        }
        if let Some(archived) = self.archived {
            prompt.archived = archived;
        }
    }
}

/// Archived-flag filter: `None` lists everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptFilter {
    pub archived: Option<bool>,
}

impl PromptFilter {
    pub fn active() -> Self {
        Self {
            archived: Some(false),
        }
    }

    pub fn archived_only() -> Self {
        Self {
            archived: Some(true),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Title,
    CreatedAt,
    #[default]
    UpdatedAt,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Title => "title",
            SortBy::CreatedAt => "createdAt",
            SortBy::UpdatedAt => "updatedAt",
        }
    }
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortBy::Title),
            "createdAt" | "created_at" => Ok(SortBy::CreatedAt),
            "updatedAt" | "updated_at" => Ok(SortBy::UpdatedAt),
            _ => Err(format!("Invalid sort key: {s}")),
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tag frequency across non-archived prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Trim and lowercase every tag, dropping empties. Order and duplicates are kept.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.iter()
        .map(|t| normalize_tag(t))
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn collection_tag(name: &str) -> String {
    format!("{}{}", COLLECTION_PREFIX, normalize_tag(name))
}

pub fn collection_name(tag: &str) -> Option<&str> {
    tag.strip_prefix(COLLECTION_PREFIX).filter(|n| !n.is_empty())
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
