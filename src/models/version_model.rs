use serde::{Deserialize, Serialize};

use super::prompt_model::now_millis;

/// Immutable snapshot of a prompt's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub prompt_id: String,
    /// `v<N>` label computed from the version count at write time
    pub version: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Version {
    /// Build a version whose label follows `existing` prior versions
    pub fn next(
        prompt_id: impl Into<String>,
        existing: usize,
        content: impl Into<String>,
        notes: Option<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            prompt_id: prompt_id.into(),
            version: version_label(existing + 1),
            content: content.into(),
            notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A version paired with a label regenerated from `createdAt` order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    #[serde(flatten)]
    pub version: Version,
    /// 1-based position in creation order, oldest first
    pub display_label: String,
    /// True for the version with the highest `createdAt`
    pub is_current: bool,
}

pub fn version_label(n: usize) -> String {
    format!("v{n}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_label() {
        let version = Version::next("p1", 0, "hello", None);
        assert_eq!(version.version, "v1");
        assert_eq!(version.prompt_id, "p1");

        let version = Version::next("p1", 4, "hello", Some("n".to_string()));
        assert_eq!(version.version, "v5");
    }

    #[test]
    fn test_version_json() {
        let mut version = Version::next("p1", 0, "hello", None);
        version.id = "ver-1".to_string();
        let json = serde_json::to_value(&version).unwrap();
        assert_eq!(json["promptId"], "p1");
        assert_eq!(json["version"], "v1");
        assert!(json.get("notes").is_none());
    }
}
