//! # Drift Detection
//!
//! Compares what a project's features say its files should be with what the
//! project actually has, and reports the difference.
//!
//! Status is computed from a [`MemoryFS`] snapshot of the project, never from
//! the disk directly. [`status_from_disk`] takes the snapshot first;
//! [`status_all`] runs that for many projects in parallel.
//!
//! ## Per-path checks
//!
//! Each owned path is checked according to its [`Ownership`]:
//!
//! | Ownership           | Missing when | Mismatch when                                    |
//! |---------------------|--------------|--------------------------------------------------|
//! | template            | absent       | bytes differ from the rendered template          |
//! | template (once)     | absent       | never                                            |
//! | required            | absent       | never                                            |
//! | json-merge          | absent       | re-merging the fragments changes the document    |
//! | link                | absent       | not a symlink to the declared target             |
//!
//! A mismatched template file is compared against every other version of the
//! same domain that declares the path, in ascending order, and the first exact
//! match is reported in [`DriftEntry::matches`].
//!
//! Missing templates and unresolved variables do not abort the report: they
//! are recorded in [`ProjectStatus::errors`] with a `MISSING` marker.

use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{FeatureDefinition, ProjectConfig};
use crate::conflict::{Conflict, ConflictKind};
use crate::error::{Error, Result};
use crate::features::{self, render_path, FeatureCatalog, ResolvedFeature};
use crate::filesystem::{self, MemoryFS};
use crate::merge::json::{merge_fragments, parse_object, JsonFragment};
use crate::ownership::{self, OwnedPath, Ownership, OwnershipMap};
use crate::version::versions_equal;

/// Which kind of ownership a drift entry was found through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriftKind {
    Template,
    Required,
    JsonMerge,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftEntry {
    pub path: String,
    /// Owner key, or comma-separated keys for JSON merge files
    pub feature: String,
    pub kind: DriftKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Another version of the feature whose template matches the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<String>,
}

impl DriftEntry {
    fn new(path: &str, feature: String, kind: DriftKind) -> Self {
        Self {
            path: path.to_string(),
            feature,
            kind,
            detail: None,
            matches: None,
        }
    }

    fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

/// Drift report for one project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStatus {
    pub project: String,
    pub missing: Vec<DriftEntry>,
    pub mismatches: Vec<DriftEntry>,
    pub conflicts: Vec<Conflict>,
    pub errors: Vec<String>,
    pub ok: bool,
}

impl ProjectStatus {
    fn finish(mut self) -> Self {
        self.ok = self.missing.is_empty()
            && self.mismatches.is_empty()
            && self.conflicts.is_empty()
            && self.errors.is_empty();
        self
    }
}

/// Search other versions of `definition`'s domain for one whose rendered
/// template at `path` equals `content` byte for byte.
///
/// Versions are tried in ascending order; the declared version is skipped.
/// Returns the matching owner key.
pub fn find_version_match(
    catalog: &FeatureCatalog,
    definition: &FeatureDefinition,
    path: &str,
    project: &ProjectConfig,
    content: &[u8],
) -> Option<String> {
    catalog
        .versions_of(&definition.domain)
        .into_iter()
        .filter(|sibling| !versions_equal(&sibling.version, &definition.version))
        .filter(|sibling| sibling.declares_file(path))
        .find(|sibling| match render_path(sibling, path, project) {
            Ok(rendered) => rendered.as_bytes() == content,
            Err(e) => {
                debug!("Skipping {} for {}: {}", sibling.owner_key(), path, e);
                false
            }
        })
        .map(|sibling| sibling.owner_key())
}

pub(crate) fn owner_keys(owned: &OwnedPath, features: &[ResolvedFeature<'_>]) -> String {
    owned
        .owners
        .iter()
        .map(|i| features[*i].owner_key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse every contributing feature's fragment for a JSON merge path.
pub(crate) fn json_fragments(
    owned: &OwnedPath,
    features: &[ResolvedFeature<'_>],
) -> Result<Vec<JsonFragment>> {
    owned
        .owners
        .iter()
        .map(|i| {
            let definition = features[*i].definition;
            let content = definition
                .templates
                .read_string(&owned.path)?
                .ok_or_else(|| Error::TemplateMissing {
                    feature: definition.owner_key(),
                    path: owned.path.clone(),
                })?;
            let value = parse_object(
                content,
                &format!("{} fragment {}", definition.owner_key(), owned.path),
            )?;
            Ok(JsonFragment::new(definition.owner_key(), value))
        })
        .collect()
}

/// Re-key merger conflicts from JSON key paths to the file they occur in.
pub(crate) fn file_conflicts(path: &str, conflicts: Vec<Conflict>) -> Vec<Conflict> {
    conflicts
        .into_iter()
        .map(|c| {
            let detail = match &c.detail {
                Some(d) => format!("{}: {}", c.path, d),
                None => c.path.clone(),
            };
            Conflict::new(path, ConflictKind::JsonMerge, c.owners).with_detail(detail)
        })
        .collect()
}

fn missing_marker(error: &Error) -> String {
    format!("MISSING template: {}", error)
}

/// Compute a project's status from a snapshot of its files.
///
/// # Errors
///
/// Fails only on configuration problems such as an undefined feature.
pub fn status(
    project: &ProjectConfig,
    catalog: &FeatureCatalog,
    tree: &MemoryFS,
) -> Result<ProjectStatus> {
    let features = features::resolve_declared(project, catalog)?;
    let definitions: Vec<&FeatureDefinition> = features.iter().map(|f| f.definition).collect();
    let ownership = ownership::detect(&definitions);
    status_with(project, catalog, &features, &ownership, tree)
}

pub(crate) fn status_with(
    project: &ProjectConfig,
    catalog: &FeatureCatalog,
    features: &[ResolvedFeature<'_>],
    ownership: &OwnershipMap,
    tree: &MemoryFS,
) -> Result<ProjectStatus> {
    let mut report = ProjectStatus {
        project: project.name.clone(),
        conflicts: ownership.conflicts.clone(),
        ..Default::default()
    };

    for owned in &ownership.owned {
        let path = owned.path.as_str();
        let feature = owner_keys(owned, features);
        let current = tree.get_file(path);

        match &owned.ownership {
            Ownership::Template { once: false } => {
                let definition = features[owned.owners[0]].definition;
                let rendered = match render_path(definition, path, project) {
                    Ok(rendered) => rendered,
                    Err(e) if e.is_template_error() => {
                        report.errors.push(missing_marker(&e));
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                match current {
                    None => report
                        .missing
                        .push(DriftEntry::new(path, feature, DriftKind::Template)),
                    Some(file) if file.is_symlink() => report.mismatches.push(
                        DriftEntry::new(path, feature, DriftKind::Template).with_detail("symlink"),
                    ),
                    Some(file) if file.content != rendered.as_bytes() => {
                        let mut entry = DriftEntry::new(path, feature, DriftKind::Template);
                        entry.matches =
                            find_version_match(catalog, definition, path, project, &file.content);
                        report.mismatches.push(entry);
                    }
                    Some(_) => {}
                }
            }
            Ownership::Template { once: true } => {
                if current.is_none() {
                    report
                        .missing
                        .push(DriftEntry::new(path, feature, DriftKind::Template));
                }
            }
            Ownership::RequiredExists => {
                if current.is_none() {
                    report
                        .missing
                        .push(DriftEntry::new(path, feature, DriftKind::Required));
                }
            }
            Ownership::Link { target } => match current {
                None => report
                    .missing
                    .push(DriftEntry::new(path, feature, DriftKind::Link)),
                Some(file) if file.link_target.as_deref() != Some(target.as_str()) => report
                    .mismatches
                    .push(DriftEntry::new(path, feature, DriftKind::Link).with_detail("link")),
                Some(_) => {}
            },
            Ownership::JsonMerge => {
                let fragments = match json_fragments(owned, features) {
                    Ok(fragments) => fragments,
                    Err(e) if e.is_template_error() => {
                        report.errors.push(missing_marker(&e));
                        continue;
                    }
                    Err(e) => {
                        report.errors.push(e.to_string());
                        continue;
                    }
                };
                let Some(file) = current else {
                    report
                        .missing
                        .push(DriftEntry::new(path, feature, DriftKind::JsonMerge));
                    continue;
                };
                let on_disk = match file.as_str().map(|s| parse_object(s, path)) {
                    Some(Ok(value)) => value,
                    _ => {
                        report.mismatches.push(
                            DriftEntry::new(path, feature, DriftKind::JsonMerge)
                                .with_detail("invalid json"),
                        );
                        continue;
                    }
                };
                let result = merge_fragments(&on_disk, &fragments)?;
                report
                    .conflicts
                    .extend(file_conflicts(path, result.conflicts));
                if result.merged != on_disk {
                    report.mismatches.push(
                        DriftEntry::new(path, feature, DriftKind::JsonMerge)
                            .with_detail("json-merge"),
                    );
                }
            }
        }
    }

    Ok(report.finish())
}

/// Snapshot the project's files and compute its status.
pub fn status_from_disk(project: &ProjectConfig, catalog: &FeatureCatalog) -> Result<ProjectStatus> {
    let features = features::resolve(project, catalog)?;
    let paths = features::needed_paths(&features);
    let tree = filesystem::snapshot(&project.path, paths.iter().map(String::as_str))?;
    let definitions: Vec<&FeatureDefinition> = features.iter().map(|f| f.definition).collect();
    let ownership = ownership::detect(&definitions);
    status_with(project, catalog, &features, &ownership, &tree)
}

/// Compute every project's status in parallel, in config order.
pub fn status_all(
    projects: &[ProjectConfig],
    catalog: &FeatureCatalog,
) -> Vec<Result<ProjectStatus>> {
    projects
        .par_iter()
        .map(|project| {
            let result = status_from_disk(project, catalog);
            if let Err(e) = &result {
                warn!("{}: {}", project.name, e);
            }
            result
        })
        .collect()
}
