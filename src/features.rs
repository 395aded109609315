//! # Feature and Version Resolution
//!
//! Turns a project's declared `{domain: version}` list into concrete feature
//! definitions, each paired with the rename/delete migrations that apply up
//! to the declared version.
//!
//! ## Migrations
//!
//! A feature's `changes` map is keyed by version. For a project declaring
//! version `V`, every change set with a key `<= V` applies, in ascending
//! version order:
//!
//! - renames compose transitively: `a -> b` at 1.1 and `b -> c` at 1.2 give
//!   `a -> c` and `b -> c`; a chain that returns to its start is dropped
//! - deletes accumulate, but a path that later becomes a rename source is no
//!   longer deleted
//!
//! The fold is pure: each step builds a new [`Migrations`] from the previous
//! one and a change set.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::Serialize;

use crate::config::{ChangeSet, FeatureDefinition, ProjectConfig};
use crate::error::{Error, Result};
use crate::template;
use crate::version::{compare_versions, versions_equal};

/// Every loaded feature definition
#[derive(Debug, Clone, Default)]
pub struct FeatureCatalog {
    features: Vec<FeatureDefinition>,
}

impl FeatureCatalog {
    pub fn new(features: Vec<FeatureDefinition>) -> Self {
        Self { features }
    }

    /// Look up a definition; `1.2` finds `1.2.0`.
    pub fn get(&self, domain: &str, version: &str) -> Option<&FeatureDefinition> {
        self.features
            .iter()
            .find(|f| f.domain == domain && versions_equal(&f.version, version))
    }

    /// All versions of a domain, ascending.
    pub fn versions_of(&self, domain: &str) -> Vec<&FeatureDefinition> {
        let mut versions: Vec<&FeatureDefinition> =
            self.features.iter().filter(|f| f.domain == domain).collect();
        versions.sort_by(|a, b| compare_versions(&a.version, &b.version));
        versions
    }

    /// Distinct domain names, sorted.
    pub fn domains(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.features.iter().map(|f| f.domain.as_str()).collect();
        set.into_iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureDefinition> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Effective renames and deletes for one feature at one version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Migrations {
    pub renames: BTreeMap<String, String>,
    pub deletes: BTreeSet<String>,
}

impl Migrations {
    /// Fold every change set with a version `<= declared`, ascending.
    pub fn fold(changes: &BTreeMap<String, ChangeSet>, declared: &str) -> Self {
        let mut applicable: Vec<(&String, &ChangeSet)> = changes
            .iter()
            .filter(|(version, _)| compare_versions(version, declared) != std::cmp::Ordering::Greater)
            .collect();
        applicable.sort_by(|a, b| compare_versions(a.0, b.0));

        applicable
            .into_iter()
            .fold(Migrations::default(), |acc, (_, change)| acc.then(change))
    }

    /// The migrations after applying one more change set.
    fn then(&self, change: &ChangeSet) -> Self {
        let mut renames: BTreeMap<String, String> = BTreeMap::new();
        for (from, to) in &self.renames {
            let to = change.renames.get(to).unwrap_or(to);
            renames.insert(from.clone(), to.clone());
        }
        for (from, to) in &change.renames {
            renames.insert(from.clone(), to.clone());
        }
        renames.retain(|from, to| from != to);

        let deletes: BTreeSet<String> = self
            .deletes
            .iter()
            .chain(change.deletes.iter())
            .filter(|path| !change.renames.contains_key(*path))
            .cloned()
            .collect();

        Self { renames, deletes }
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.deletes.is_empty()
    }
}

/// A declared feature resolved to its definition
#[derive(Debug, Clone)]
pub struct ResolvedFeature<'a> {
    pub definition: &'a FeatureDefinition,
    pub migrations: Migrations,
}

/// A template file rendered for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: String,
    pub content: String,
}

impl<'a> ResolvedFeature<'a> {
    pub fn owner_key(&self) -> String {
        self.definition.owner_key()
    }

    /// Render every file in `files` for `project`.
    pub fn render_files(&self, project: &ProjectConfig) -> Result<Vec<RenderedFile>> {
        self.definition
            .files
            .iter()
            .map(|path| {
                Ok(RenderedFile {
                    path: path.clone(),
                    content: render_path(self.definition, path, project)?,
                })
            })
            .collect()
    }
}

/// Render one template path of `definition` with `project`'s variables.
///
/// # Errors
///
/// `Error::TemplateMissing` if the definition has no template content for
/// `path`; `Error::Template` if a placeholder is unresolved.
pub fn render_path(
    definition: &FeatureDefinition,
    path: &str,
    project: &ProjectConfig,
) -> Result<String> {
    let content = definition
        .templates
        .read_string(path)?
        .ok_or_else(|| Error::TemplateMissing {
            feature: definition.owner_key(),
            path: path.to_string(),
        })?;

    template::render(
        content,
        &project.template_vars,
        &definition.ignored_template_variables,
    )
    .map_err(|e| match e {
        Error::Template { message, variable } => Error::Template {
            message: format!("{} in {} ({})", message, path, definition.owner_key()),
            variable,
        },
        other => other,
    })
}

/// Fail unless the project root exists and is a directory.
pub fn check_project_path(project: &ProjectConfig) -> Result<()> {
    let message = if !project.path.exists() {
        "does not exist"
    } else if !project.path.is_dir() {
        "is not a directory"
    } else {
        return Ok(());
    };
    Err(Error::ProjectPath {
        project: project.name.clone(),
        path: project.path.display().to_string(),
        message: message.to_string(),
    })
}

/// Resolve the declared features without touching the disk.
pub fn resolve_declared<'a>(
    project: &ProjectConfig,
    catalog: &'a FeatureCatalog,
) -> Result<Vec<ResolvedFeature<'a>>> {
    project
        .features
        .iter()
        .map(|feature| {
            let definition = catalog
                .get(&feature.domain, &feature.version)
                .ok_or_else(|| Error::FeatureNotFound {
                    domain: feature.domain.clone(),
                    version: feature.version.clone(),
                })?;
            let migrations = Migrations::fold(&definition.changes, &definition.version);
            debug!(
                "{}: resolved {} ({} renames, {} deletes)",
                project.name,
                definition.owner_key(),
                migrations.renames.len(),
                migrations.deletes.len()
            );
            Ok(ResolvedFeature {
                definition,
                migrations,
            })
        })
        .collect()
}

/// Check the project path, then resolve every declared feature.
pub fn resolve<'a>(
    project: &ProjectConfig,
    catalog: &'a FeatureCatalog,
) -> Result<Vec<ResolvedFeature<'a>>> {
    check_project_path(project)?;
    resolve_declared(project, catalog)
}

/// Every repo-relative path a status or sync pass may need to read.
pub fn needed_paths(features: &[ResolvedFeature<'_>]) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    for feature in features {
        let def = feature.definition;
        paths.extend(def.files.iter().cloned());
        paths.extend(def.template_files.iter().cloned());
        paths.extend(def.file_rules.keys().cloned());
        paths.extend(def.file_merge.json.iter().cloned());
        paths.extend(def.links.iter().map(|l| l.path.clone()));
        for (from, to) in &feature.migrations.renames {
            paths.insert(from.clone());
            paths.insert(to.clone());
        }
        paths.extend(feature.migrations.deletes.iter().cloned());
    }
    paths
}
