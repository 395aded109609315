//! Explain report: what each declared feature owns in a project and which
//! migrations apply to it.

use serde::Serialize;

use crate::config::{FeatureDefinition, ProjectConfig};
use crate::conflict::Conflict;
use crate::error::Result;
use crate::features::{self, FeatureCatalog, Migrations};
use crate::ownership::{self, Ownership};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainedPath {
    pub path: String,
    pub ownership: Ownership,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureExplain {
    pub feature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub paths: Vec<ExplainedPath>,
    pub migrations: Migrations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectExplain {
    pub project: String,
    pub features: Vec<FeatureExplain>,
    pub conflicts: Vec<Conflict>,
}

/// Build the explain report for `project`. Reads nothing from disk.
pub fn explain(project: &ProjectConfig, catalog: &FeatureCatalog) -> Result<ProjectExplain> {
    let resolved = features::resolve_declared(project, catalog)?;
    let definitions: Vec<&FeatureDefinition> = resolved.iter().map(|f| f.definition).collect();
    let map = ownership::detect(&definitions);

    let features = resolved
        .iter()
        .enumerate()
        .map(|(index, feature)| FeatureExplain {
            feature: feature.owner_key(),
            description: feature.definition.description.clone(),
            paths: map
                .owned
                .iter()
                .filter(|o| o.owners.contains(&index))
                .map(|o| ExplainedPath {
                    path: o.path.clone(),
                    ownership: o.ownership.clone(),
                })
                .collect(),
            migrations: feature.migrations.clone(),
        })
        .collect();

    Ok(ProjectExplain {
        project: project.name.clone(),
        features,
        conflicts: map.conflicts,
    })
}
