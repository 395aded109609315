//! Merge operations
//!
//! Two kinds of merge are used when reconciling project files with their
//! feature templates:
//!
//! - JSON (json.rs) - deep merge of feature fragments into a JSON document,
//!   with per-key source tracking and conflict reporting
//! - Text (text.rs) - three-way line merge of an old template, the local file
//!   and the new template

pub mod json;
#[cfg(test)]
mod json_proptest;
pub mod text;

pub use json::{merge_fragments, to_stable_string, JsonFragment, JsonMergeResult};
pub use text::{GitMergeFile, TextMerge, ThreeWayMerge};
