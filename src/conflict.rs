//! Conflict records shared by the ownership detector, the JSON merger and the
//! sync planner.
//!
//! A conflict is data, not an error. It blocks writes to its path until the
//! configuration or the project file is fixed by hand.

use serde::Serialize;

/// Kind of conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    /// Two or more features claim the same path
    Ownership,
    /// Two JSON fragments write different values to the same key path
    JsonMerge,
    /// A three-way text merge could not reconcile local edits
    Merge,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Ownership => "ownership",
            ConflictKind::JsonMerge => "json-merge",
            ConflictKind::Merge => "merge",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub owners: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl Conflict {
    pub fn new(path: impl Into<String>, kind: ConflictKind, owners: Vec<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            owners,
            detail: None,
            resolution: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_serializes_kebab_type_and_skips_empty_fields() {
        let conflict = Conflict::new(
            "scripts.lint",
            ConflictKind::JsonMerge,
            vec!["a@1".to_string(), "b@1".to_string()],
        );
        let json = serde_json::to_value(&conflict).unwrap();
        assert_eq!(json["type"], "json-merge");
        assert!(json.get("kind").is_none());
        assert!(json.get("detail").is_none());
        assert!(json.get("resolution").is_none());
    }

    #[test]
    fn test_conflict_builders() {
        let conflict = Conflict::new("a.txt", ConflictKind::Merge, vec!["lint@2".to_string()])
            .with_detail("local edits")
            .with_resolution("kept local");
        assert_eq!(conflict.detail.as_deref(), Some("local edits"));
        assert_eq!(conflict.resolution.as_deref(), Some("kept local"));
        assert_eq!(conflict.kind.to_string(), "merge");
    }
}
