//! JSON fragment merging
//!
//! Features contribute partial JSON objects ("fragments") to shared files such
//! as `package.json`. This module deep-merges those fragments, in order, into a
//! base document and reports where two features disagree.
//!
//! ## Rules
//!
//! - Objects merge key by key, recursively.
//! - Any other value, arrays included, replaces what was there.
//! - The later fragment wins a direct collision.
//! - A conflict is recorded at a key path when a fragment overwrites a value
//!   last written by a *different* fragment with a value that is not equal.
//!   Values from the base document have no source and never conflict.
//! - When a key changes between object and non-object, conflicts recorded
//!   under the old subtree are dropped and the overwrite is judged on its own.
//!
//! Only the most recent writer of a path is compared, so three fragments that
//! write `1`, `2`, `2` yield a single conflict between the first two.
//!
//! ## Example
//!
//! ```
//! use feature_sync::merge::json::{merge_fragments, JsonFragment};
//! use serde_json::json;
//!
//! let fragments = vec![
//!     JsonFragment::new("lint@1.0.0", json!({"scripts": {"lint": "eslint ."}})),
//!     JsonFragment::new("test@1.0.0", json!({"scripts": {"test": "vitest"}})),
//! ];
//! let result = merge_fragments(&json!({"name": "web"}), &fragments).unwrap();
//! assert!(result.conflicts.is_empty());
//! assert_eq!(result.merged["scripts"]["test"], "vitest");
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};

use crate::conflict::{Conflict, ConflictKind};
use crate::error::{Error, Result};

/// One feature's contribution to a JSON file
#[derive(Debug, Clone, PartialEq)]
pub struct JsonFragment {
    /// Owner key of the contributing feature (`domain@version`)
    pub source: String,
    pub value: JsonValue,
}

impl JsonFragment {
    pub fn new(source: impl Into<String>, value: JsonValue) -> Self {
        Self {
            source: source.into(),
            value,
        }
    }
}

/// Result of merging fragments into a base document
#[derive(Debug, Clone, PartialEq)]
pub struct JsonMergeResult {
    pub merged: JsonValue,
    pub conflicts: Vec<Conflict>,
}

/// A key path as its segments; a key may itself contain `.`
type KeyPath = Vec<String>;

#[derive(Default)]
struct MergeState {
    /// Most recent source to write each key path
    writers: BTreeMap<KeyPath, String>,
    conflicts: Vec<(KeyPath, Conflict)>,
}

impl MergeState {
    /// Drop conflicts at or below `path`.
    fn clear_subtree(&mut self, path: &[String]) {
        self.conflicts.retain(|(p, _)| !p.starts_with(path));
    }

    /// Record `source` as the writer of `path` and everything below it.
    fn record(&mut self, path: &[String], value: &JsonValue, source: &str) {
        if let JsonValue::Object(map) = value {
            for (key, child) in map {
                self.record(&child_path(path, key), child, source);
            }
        }
        self.writers.insert(path.to_vec(), source.to_string());
    }

    /// Forget writers strictly below `path`.
    fn forget_descendants(&mut self, path: &[String]) {
        self.writers
            .retain(|p, _| p.len() <= path.len() || !p.starts_with(path));
    }
}

fn child_path(prefix: &[String], key: &str) -> KeyPath {
    let mut path = prefix.to_vec();
    path.push(key.to_string());
    path
}

fn merge_object(
    target: &mut Map<String, JsonValue>,
    incoming: &Map<String, JsonValue>,
    prefix: &[String],
    source: &str,
    state: &mut MergeState,
) {
    for (key, value) in incoming {
        let path = child_path(prefix, key);
        match target.get_mut(key) {
            Some(JsonValue::Object(existing)) if value.is_object() => {
                if let JsonValue::Object(inner) = value {
                    merge_object(existing, inner, &path, source, state);
                }
                state.writers.insert(path, source.to_string());
            }
            Some(existing) => {
                if existing.is_object() != value.is_object() {
                    state.clear_subtree(&path);
                }
                let previous = state.writers.get(&path).cloned();
                if let Some(previous) = previous {
                    if previous != source && *existing != *value {
                        let conflict = Conflict::new(
                            path.join("."),
                            ConflictKind::JsonMerge,
                            vec![previous.clone(), source.to_string()],
                        )
                        .with_detail(format!(
                            "{} sets {}, {} sets {}",
                            previous, existing, source, value
                        ));
                        state.conflicts.push((path.clone(), conflict));
                    }
                }
                *existing = value.clone();
                state.forget_descendants(&path);
                state.record(&path, value, source);
            }
            None => {
                target.insert(key.clone(), value.clone());
                state.record(&path, value, source);
            }
        }
    }
}

/// Deep-merge `fragments`, in order, into `base`.
///
/// # Errors
///
/// Returns `Error::Merge` when `base` or a fragment is not a JSON object.
pub fn merge_fragments(base: &JsonValue, fragments: &[JsonFragment]) -> Result<JsonMergeResult> {
    let mut merged = match base {
        JsonValue::Object(map) => map.clone(),
        other => {
            return Err(Error::Merge {
                operation: "json merge".to_string(),
                message: format!("Base document must be an object, found {}", type_name(other)),
            })
        }
    };

    let mut state = MergeState::default();
    for fragment in fragments {
        let incoming = fragment.value.as_object().ok_or_else(|| Error::Merge {
            operation: "json merge".to_string(),
            message: format!(
                "Fragment from {} must be an object, found {}",
                fragment.source,
                type_name(&fragment.value)
            ),
        })?;
        merge_object(&mut merged, incoming, &[], &fragment.source, &mut state);
    }

    Ok(JsonMergeResult {
        merged: JsonValue::Object(merged),
        conflicts: state.conflicts.into_iter().map(|(_, c)| c).collect(),
    })
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Parse `content` as a JSON object, naming `path` in the error.
pub fn parse_object(content: &str, path: &str) -> Result<JsonValue> {
    let value: JsonValue = serde_json::from_str(content).map_err(|e| Error::Merge {
        operation: "json parse".to_string(),
        message: format!("{}: {}", path, e),
    })?;
    if !value.is_object() {
        return Err(Error::Merge {
            operation: "json parse".to_string(),
            message: format!("{}: expected an object, found {}", path, type_name(&value)),
        });
    }
    Ok(value)
}

/// Serialize with two-space indentation and a trailing newline.
pub fn to_stable_string(value: &JsonValue) -> Result<String> {
    let serialized = serde_json::to_string_pretty(value)?;
    Ok(ensure_trailing_newline(serialized))
}

fn ensure_trailing_newline(mut content: String) -> String {
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content
}
