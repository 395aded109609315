//! # Add Command Implementation
//!
//! Declares a feature version in a project's config file, or moves an
//! already declared domain to another version:
//!
//! ```bash
//! feature-sync add -p web lint@2.0.0
//! ```
//!
//! The feature must be defined in the workspace. Only JSON project files
//! are rewritten; the rest of the file keeps its keys and key order. Run
//! `feature-sync sync` afterwards to bring the project's files in line.

use anyhow::{Context, Result};
use clap::Args;

use feature_sync::config::FeatureRef;
use feature_sync::features::FeatureCatalog;
use feature_sync::output::{emoji, OutputConfig};
use feature_sync::{config, suggestions};

use super::{load_workspace, Outcome, RootArg};

/// Declare a feature version in a project
#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub root: RootArg,

    /// The project to change.
    #[arg(short, long, value_name = "NAME")]
    pub project: String,

    /// The feature to declare, as DOMAIN@VERSION.
    #[arg(value_name = "FEATURE@VERSION")]
    pub feature: String,
}

/// Execute the `add` command.
pub fn execute(args: AddArgs, color_flag: &str) -> Result<Outcome> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let feature =
        FeatureRef::parse(&args.feature).map_err(|_| suggestions::invalid_feature_ref(&args.feature))?;

    let workspace = load_workspace(&args.root.root)?;
    let known: Vec<&str> = workspace.projects.iter().map(|p| p.name.as_str()).collect();
    let project = workspace
        .project(&args.project)
        .ok_or_else(|| suggestions::unknown_project(&args.project, &known))?;

    let catalog = FeatureCatalog::new(workspace.features.clone());
    if catalog.get(&feature.domain, &feature.version).is_none() {
        let versions: Vec<&str> = catalog
            .versions_of(&feature.domain)
            .into_iter()
            .map(|f| f.version.as_str())
            .collect();
        return Err(suggestions::unknown_feature(
            &feature.domain,
            &feature.version,
            &catalog.domains(),
            &versions,
        ));
    }

    let config_file = project.config_file.as_deref().ok_or_else(|| {
        anyhow::anyhow!("Project '{}' was not loaded from a file", project.name)
    })?;
    config::set_project_feature(config_file, &feature.domain, &feature.version)
        .with_context(|| format!("Failed to update {}", config_file.display()))?;

    println!(
        "{} {}: declared {}",
        emoji(&out, "✅", "[OK]"),
        project.name,
        feature.owner_key()
    );
    Ok(Outcome::Clean)
}
