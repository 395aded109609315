//! # Sync Planning
//!
//! Builds, for one project, the ordered list of file actions that brings it
//! back in line with its declared features. Planning never touches the disk;
//! [`crate::apply::apply`] carries a plan out.
//!
//! ## Steps
//!
//! 1.  **Migrations**: each feature's folded renames and deletes are planned
//!     against a copy of the project tree, and staged on that copy. A rename
//!     whose destination already exists becomes a delete of the source. Paths
//!     owned by any feature are never renamed away or deleted.
//!
//! 2.  **Drift**: every owned path is compared against the staged tree.
//!     Template files that drifted are three-way merged when an older version
//!     of the feature also declared them:
//!
//!     - base: the version the file matches, else the nearest older version
//!     - local: the project's file
//!     - remote: the declared version
//!
//!     A file no older version declared is overwritten directly.
//!
//! 3.  **Conflicts**: a textual merge conflict is handled per
//!     [`ConflictStrategy`]. JSON fragment conflicts always block the path.
//!
//! 4.  **Validation**: a rename whose destination is also written turns into a
//!     delete of the source; then [`validate_actions`] rejects any plan that
//!     touches a final path ambiguously.
//!
//! Every problem is collected in [`SyncPlan::errors`] instead of stopping at
//! the first one. A plan with errors is blocked and applies nothing.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::Serialize;

use crate::config::{FeatureDefinition, ProjectConfig};
use crate::conflict::{Conflict, ConflictKind};
use crate::error::Result;
use crate::features::{self, render_path, FeatureCatalog, ResolvedFeature};
use crate::filesystem::{self, MemoryFS};
use crate::merge::json::{merge_fragments, parse_object, to_stable_string};
use crate::merge::text::ThreeWayMerge;
use crate::ownership::{self, OwnedPath, Ownership, OwnershipMap};
use crate::status::{file_conflicts, find_version_match, json_fragments, owner_keys};
use crate::version::compare_versions;

/// What to do when a three-way merge has textual conflicts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// Record the conflict and block the project
    #[default]
    None,
    /// Write the merge output with conflict markers
    Markers,
    /// Leave the local file untouched
    KeepLocal,
    /// Replace the local file with the template
    Overwrite,
}

impl ConflictStrategy {
    pub const VARIANTS: [&'static str; 4] = ["none", "markers", "keep-local", "overwrite"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::None => "none",
            ConflictStrategy::Markers => "markers",
            ConflictStrategy::KeepLocal => "keep-local",
            ConflictStrategy::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "none" => Ok(ConflictStrategy::None),
            "markers" => Ok(ConflictStrategy::Markers),
            "keep-local" => Ok(ConflictStrategy::KeepLocal),
            "overwrite" => Ok(ConflictStrategy::Overwrite),
            other => Err(format!(
                "unknown conflict strategy '{}' (expected one of: {})",
                other,
                Self::VARIANTS.join(", ")
            )),
        }
    }
}

/// One file-system change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SyncAction {
    Rename { from: String, to: String },
    Delete { path: String },
    Write {
        path: String,
        content: String,
        source: String,
    },
    Link {
        path: String,
        target: String,
        source: String,
    },
}

impl SyncAction {
    /// Application order: renames, deletes, writes, links.
    fn rank(&self) -> u8 {
        match self {
            SyncAction::Rename { .. } => 0,
            SyncAction::Delete { .. } => 1,
            SyncAction::Write { .. } => 2,
            SyncAction::Link { .. } => 3,
        }
    }

    /// The path this action leaves behind, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            SyncAction::Rename { to, .. } => Some(to),
            SyncAction::Delete { .. } => None,
            SyncAction::Write { path, .. } | SyncAction::Link { path, .. } => Some(path),
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Rename { from, to } => write!(f, "rename {} -> {}", from, to),
            SyncAction::Delete { path } => write!(f, "delete {}", path),
            SyncAction::Write { path, source, .. } => write!(f, "write {} ({})", path, source),
            SyncAction::Link { path, target, .. } => write!(f, "link {} -> {}", path, target),
        }
    }
}

/// Planned changes for one project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub project: String,
    pub actions: Vec<SyncAction>,
    pub conflicts: Vec<Conflict>,
    pub errors: Vec<String>,
}

impl SyncPlan {
    /// A blocked plan must not be applied.
    pub fn is_blocked(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Check an action list for ambiguous final paths.
///
/// Returns one message per problem: a path written twice, a path targeted by
/// two renames, a rename colliding with a write, or a path both deleted and
/// written.
pub fn validate_actions(actions: &[SyncAction]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut written: BTreeSet<&str> = BTreeSet::new();
    let mut rename_targets: BTreeSet<&str> = BTreeSet::new();
    let mut rename_sources: BTreeSet<&str> = BTreeSet::new();
    let mut deleted: BTreeSet<&str> = BTreeSet::new();

    for action in actions {
        match action {
            SyncAction::Write { path, .. } | SyncAction::Link { path, .. } => {
                if !written.insert(path) {
                    errors.push(format!("{}: written more than once", path));
                }
            }
            SyncAction::Rename { from, to } => {
                if !rename_targets.insert(to) {
                    errors.push(format!("{}: target of more than one rename", to));
                }
                rename_sources.insert(from);
            }
            SyncAction::Delete { path } => {
                deleted.insert(path);
            }
        }
    }

    for path in &written {
        if rename_targets.contains(path) {
            errors.push(format!("{}: rename target collides with a write", path));
        }
        if rename_sources.contains(path) {
            errors.push(format!("{}: renamed away and written in the same pass", path));
        }
        if deleted.contains(path) {
            errors.push(format!("{}: deleted and written in the same pass", path));
        }
    }
    for path in &rename_targets {
        if deleted.contains(path) {
            errors.push(format!("{}: rename target is also deleted", path));
        }
    }

    errors
}

struct Planner<'a> {
    project: &'a ProjectConfig,
    catalog: &'a FeatureCatalog,
    features: &'a [ResolvedFeature<'a>],
    ownership: &'a OwnershipMap,
    strategy: ConflictStrategy,
    merger: &'a dyn ThreeWayMerge,
    plan: SyncPlan,
}

impl<'a> Planner<'a> {
    fn error(&mut self, path: &str, message: impl fmt::Display) {
        self.plan.errors.push(format!("{}: {}", path, message));
    }

    fn plan_migrations(&mut self, staged: &mut MemoryFS) {
        let mut renamed: BTreeSet<String> = BTreeSet::new();
        for feature in self.features {
            for (from, to) in &feature.migrations.renames {
                if !staged.exists(from) {
                    continue;
                }
                if self.ownership.is_claimed(from) {
                    debug!("{}: {} is still owned, not renaming", self.project.name, from);
                    continue;
                }
                if staged.exists(to) {
                    warn!(
                        "{}: {} already exists, deleting {} instead of renaming",
                        self.project.name, to, from
                    );
                    staged.remove_file(from);
                    self.plan.actions.push(SyncAction::Delete { path: from.clone() });
                    continue;
                }
                if staged.rename_file(from, to).is_ok() {
                    renamed.insert(from.clone());
                    renamed.insert(to.clone());
                    self.plan.actions.push(SyncAction::Rename {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        for feature in self.features {
            for path in &feature.migrations.deletes {
                if !staged.exists(path) || renamed.contains(path) || self.ownership.is_claimed(path)
                {
                    continue;
                }
                staged.remove_file(path);
                self.plan.actions.push(SyncAction::Delete { path: path.clone() });
            }
        }
    }

    fn plan_path(&mut self, owned: &OwnedPath, staged: &MemoryFS) -> Result<()> {
        let path = owned.path.as_str();
        match &owned.ownership {
            Ownership::Template { once: false } => self.plan_template(owned, staged),
            Ownership::Template { once: true } => {
                if !staged.exists(path) {
                    let definition = self.features[owned.owners[0]].definition;
                    match render_path(definition, path, self.project) {
                        Ok(content) => self.push_write(path, content, definition.owner_key()),
                        Err(e) => self.error(path, e),
                    }
                }
                Ok(())
            }
            Ownership::RequiredExists => Ok(()),
            Ownership::Link { target } => {
                match staged.get_file(path) {
                    Some(file) if file.link_target.as_deref() == Some(target.as_str()) => {}
                    Some(file) if !file.is_symlink() => {
                        self.error(path, format!("exists and is not a symlink to {}", target))
                    }
                    _ => {
                        let source = owner_keys(owned, self.features);
                        self.plan.actions.push(SyncAction::Link {
                            path: path.to_string(),
                            target: target.clone(),
                            source,
                        });
                    }
                }
                Ok(())
            }
            Ownership::JsonMerge => self.plan_json(owned, staged),
        }
    }

    fn push_write(&mut self, path: &str, content: String, source: String) {
        debug!("{}: write {}", self.project.name, path);
        self.plan.actions.push(SyncAction::Write {
            path: path.to_string(),
            content,
            source,
        });
    }

    fn plan_template(&mut self, owned: &OwnedPath, staged: &MemoryFS) -> Result<()> {
        let path = owned.path.as_str();
        let definition = self.features[owned.owners[0]].definition;
        let source = definition.owner_key();
        let remote = match render_path(definition, path, self.project) {
            Ok(remote) => remote,
            Err(e) => {
                self.error(path, e);
                return Ok(());
            }
        };

        let file = match staged.get_file(path) {
            None => {
                self.push_write(path, remote, source);
                return Ok(());
            }
            Some(file) if !file.is_symlink() && file.content == remote.as_bytes() => {
                return Ok(());
            }
            Some(file) => file,
        };

        let local = match (file.is_symlink(), file.as_str()) {
            (false, Some(local)) => local,
            _ => {
                debug!("{}: {} is not a text file, overwriting", self.project.name, path);
                self.push_write(path, remote, source);
                return Ok(());
            }
        };

        let Some(base_def) = self.merge_base(definition, path, file.content.as_slice()) else {
            self.push_write(path, remote, source);
            return Ok(());
        };
        let base = match render_path(base_def, path, self.project) {
            Ok(base) => base,
            Err(e) => {
                self.error(path, e);
                return Ok(());
            }
        };

        debug!(
            "{}: merging {} (base {}, target {})",
            self.project.name,
            path,
            base_def.owner_key(),
            source
        );
        let merged = match self.merger.merge(&base, local, &remote) {
            Ok(merged) => merged,
            Err(e) => {
                self.error(path, e);
                return Ok(());
            }
        };

        if !merged.has_conflict {
            if merged.content != local {
                self.push_write(path, merged.content, source);
            }
            return Ok(());
        }

        let conflict = Conflict::new(path, ConflictKind::Merge, vec![source.clone()]).with_detail(
            format!(
                "local changes conflict with {} (merge base {})",
                source,
                base_def.owner_key()
            ),
        );
        match self.strategy {
            ConflictStrategy::None => {
                self.plan.conflicts.push(conflict);
                self.error(path, "merge conflict");
            }
            ConflictStrategy::Markers => {
                self.plan.conflicts.push(conflict.with_resolution("markers"));
                self.push_write(path, merged.content, source);
            }
            ConflictStrategy::KeepLocal => {
                self.plan
                    .conflicts
                    .push(conflict.with_resolution("kept local"));
            }
            ConflictStrategy::Overwrite => {
                self.plan
                    .conflicts
                    .push(conflict.with_resolution("overwrote with template"));
                self.push_write(path, remote, source);
            }
        }
        Ok(())
    }

    /// Pick the version whose template is the common ancestor of the local
    /// file, or `None` when no older version declares `path`.
    fn merge_base(
        &self,
        definition: &FeatureDefinition,
        path: &str,
        content: &[u8],
    ) -> Option<&'a FeatureDefinition> {
        let older: Vec<&'a FeatureDefinition> = self
            .catalog
            .versions_of(&definition.domain)
            .into_iter()
            .filter(|v| compare_versions(&v.version, &definition.version).is_lt())
            .filter(|v| v.declares_file(path))
            .collect();
        if older.is_empty() {
            return None;
        }

        let matched = find_version_match(self.catalog, definition, path, self.project, content)
            .and_then(|key| {
                self.catalog
                    .versions_of(&definition.domain)
                    .into_iter()
                    .find(|v| v.owner_key() == key)
            });
        matched.or_else(|| older.last().copied())
    }

    fn plan_json(&mut self, owned: &OwnedPath, staged: &MemoryFS) -> Result<()> {
        let path = owned.path.as_str();
        let fragments = match json_fragments(owned, self.features) {
            Ok(fragments) => fragments,
            Err(e) => {
                self.error(path, e);
                return Ok(());
            }
        };

        let current = match staged.get_file(path) {
            None => None,
            Some(file) => match file.as_str().map(|s| parse_object(s, path)) {
                Some(Ok(value)) => Some(value),
                _ => {
                    self.error(path, "existing file is not a JSON object");
                    return Ok(());
                }
            },
        };

        let base = current
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        let result = merge_fragments(&base, &fragments)?;
        if !result.conflicts.is_empty() {
            let count = result.conflicts.len();
            self.plan
                .conflicts
                .extend(file_conflicts(path, result.conflicts));
            self.error(path, format!("{} conflicting JSON fragment value(s)", count));
            return Ok(());
        }

        if current.as_ref() != Some(&result.merged) {
            let content = to_stable_string(&result.merged)?;
            self.push_write(path, content, owner_keys(owned, self.features));
        }
        Ok(())
    }

    /// Turn renames whose destination is also written into deletes, then
    /// order and validate.
    fn finish(mut self) -> SyncPlan {
        let written: BTreeSet<String> = self
            .plan
            .actions
            .iter()
            .filter_map(|a| match a {
                SyncAction::Write { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect();
        for action in self.plan.actions.iter_mut() {
            if let SyncAction::Rename { from, to } = action {
                if written.contains(to.as_str()) {
                    debug!("{}: rename {} -> {} folded into write", self.plan.project, from, to);
                    *action = SyncAction::Delete { path: from.clone() };
                }
            }
        }

        self.plan.actions.sort_by_key(SyncAction::rank);
        let collisions = validate_actions(&self.plan.actions);
        self.plan.errors.extend(collisions);
        self.plan
    }
}

/// Plan a sync for `project` against a snapshot of its files.
///
/// # Errors
///
/// Fails on configuration problems only; per-path problems are collected in
/// [`SyncPlan::errors`].
pub fn plan(
    project: &ProjectConfig,
    catalog: &FeatureCatalog,
    tree: &MemoryFS,
    strategy: ConflictStrategy,
    merger: &dyn ThreeWayMerge,
) -> Result<SyncPlan> {
    let features = features::resolve_declared(project, catalog)?;
    plan_with(project, catalog, &features, tree, strategy, merger)
}

fn plan_with(
    project: &ProjectConfig,
    catalog: &FeatureCatalog,
    features: &[ResolvedFeature<'_>],
    tree: &MemoryFS,
    strategy: ConflictStrategy,
    merger: &dyn ThreeWayMerge,
) -> Result<SyncPlan> {
    let definitions: Vec<&FeatureDefinition> = features.iter().map(|f| f.definition).collect();
    let ownership = ownership::detect(&definitions);

    let mut planner = Planner {
        project,
        catalog,
        features,
        ownership: &ownership,
        strategy,
        merger,
        plan: SyncPlan {
            project: project.name.clone(),
            conflicts: ownership.conflicts.clone(),
            ..Default::default()
        },
    };

    let mut staged = tree.clone();
    planner.plan_migrations(&mut staged);
    for owned in &ownership.owned {
        planner.plan_path(owned, &staged)?;
    }
    Ok(planner.finish())
}

/// Snapshot the project's files and plan a sync.
pub fn plan_from_disk(
    project: &ProjectConfig,
    catalog: &FeatureCatalog,
    strategy: ConflictStrategy,
    merger: &dyn ThreeWayMerge,
) -> Result<SyncPlan> {
    let features = features::resolve(project, catalog)?;
    let paths = features::needed_paths(&features);
    let tree = filesystem::snapshot(&project.path, paths.iter().map(String::as_str))?;
    plan_with(project, catalog, &features, &tree, strategy, merger)
}
