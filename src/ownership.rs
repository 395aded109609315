//! Path ownership and ownership conflicts
//!
//! Every repo-relative path a project's features touch is claimed in one of
//! four ways, modelled by [`Ownership`]. A path claimed by more than one
//! feature is an ownership conflict, except when every claim is a JSON merge
//! fragment: those are contributions to one shared document.
//!
//! Conflicting paths are reported and left out of [`OwnershipMap::owned`], so
//! nothing downstream reads or writes them.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::FeatureDefinition;
use crate::conflict::{Conflict, ConflictKind};

/// How a feature owns a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Ownership {
    /// Full content owned by a rendered template. `once` files are only
    /// written when absent.
    Template { once: bool },
    /// Presence only
    RequiredExists,
    /// A fragment deep-merged into a JSON document
    JsonMerge,
    /// A symbolic link to `target`
    Link { target: String },
}

impl Ownership {
    /// Short label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Ownership::Template { once: false } => "template",
            Ownership::Template { once: true } => "template (once)",
            Ownership::RequiredExists => "required",
            Ownership::JsonMerge => "json-merge",
            Ownership::Link { .. } => "link",
        }
    }

    fn is_shared(&self) -> bool {
        matches!(self, Ownership::JsonMerge)
    }
}

/// A path with a single, unambiguous ownership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedPath {
    pub path: String,
    pub ownership: Ownership,
    /// Indices of the owning features in declaration order. Only JSON merge
    /// paths have more than one.
    pub owners: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipMap {
    /// Non-conflicting paths, sorted by path
    pub owned: Vec<OwnedPath>,
    pub conflicts: Vec<Conflict>,
}

impl OwnershipMap {
    pub fn get(&self, path: &str) -> Option<&OwnedPath> {
        self.owned.iter().find(|o| o.path == path)
    }

    /// Whether any feature owns `path`, conflicting or not.
    pub fn is_claimed(&self, path: &str) -> bool {
        self.get(path).is_some() || self.conflicts.iter().any(|c| c.path == path)
    }
}

/// All claims a feature makes, in a fixed order.
pub fn claims(definition: &FeatureDefinition) -> Vec<(String, Ownership)> {
    let mut out = Vec::new();
    for path in &definition.files {
        out.push((path.clone(), Ownership::Template { once: false }));
    }
    for path in &definition.template_files {
        out.push((path.clone(), Ownership::Template { once: true }));
    }
    for path in definition.file_rules.keys() {
        out.push((path.clone(), Ownership::RequiredExists));
    }
    for link in &definition.links {
        out.push((
            link.path.clone(),
            Ownership::Link {
                target: link.target.clone(),
            },
        ));
    }
    for path in &definition.file_merge.json {
        out.push((path.clone(), Ownership::JsonMerge));
    }
    out
}

/// Build the ownership map for features in declaration order.
pub fn detect(features: &[&FeatureDefinition]) -> OwnershipMap {
    let mut by_path: BTreeMap<String, Vec<(usize, Ownership)>> = BTreeMap::new();
    for (index, definition) in features.iter().enumerate() {
        for (path, ownership) in claims(definition) {
            let entry = by_path.entry(path).or_default();
            // a feature keeps its first claim on a path
            if !entry.iter().any(|(i, _)| *i == index) {
                entry.push((index, ownership));
            }
        }
    }

    let mut map = OwnershipMap::default();
    for (path, claims) in by_path {
        let owners: Vec<usize> = claims.iter().map(|(i, _)| *i).collect();
        if owners.len() == 1 || claims.iter().all(|(_, o)| o.is_shared()) {
            map.owned.push(OwnedPath {
                path,
                ownership: claims[0].1.clone(),
                owners,
            });
            continue;
        }

        let detail = claims
            .iter()
            .map(|(i, o)| format!("{} as {}", features[*i].owner_key(), o.label()))
            .collect::<Vec<_>>()
            .join(", ");
        map.conflicts.push(
            Conflict::new(
                path,
                ConflictKind::Ownership,
                owners.iter().map(|i| features[*i].owner_key()).collect(),
            )
            .with_detail(detail),
        );
    }
    map
}
