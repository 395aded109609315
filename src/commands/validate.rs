//! # Validate Command Implementation
//!
//! Checks that the workspace configuration is usable without looking at or
//! changing any project's files beyond its root directory:
//!
//! - **Parsing**: every project and feature file parses, with no duplicate
//!   project names or feature versions.
//! - **Resolution**: every declared `domain@version` is defined and every
//!   project path is a directory.
//! - **Rendering**: every template a project uses renders with the project's
//!   variables.
//!
//! Ownership conflicts are reported as warnings; they are not configuration
//! errors.

use anyhow::Result;
use clap::Args;

use feature_sync::config::FeatureDefinition;
use feature_sync::features::{self, FeatureCatalog};
use feature_sync::output::{emoji, OutputConfig};
use feature_sync::ownership;

use super::{load_workspace, Outcome, RootArg};

/// Validate projects and feature definitions
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub root: RootArg,
}

/// Execute the `validate` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<Outcome> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Validating workspace: {}",
        emoji(&out, "🔍", "[SCAN]"),
        args.root.root.display()
    );

    let workspace = load_workspace(&args.root.root)?;
    println!(
        "{} Loaded {} project(s) and {} feature version(s)",
        emoji(&out, "✅", "[OK]"),
        workspace.projects.len(),
        workspace.features.len()
    );

    let catalog = FeatureCatalog::new(workspace.features);
    let mut problems = 0usize;
    let mut warnings = 0usize;

    for project in &workspace.projects {
        let resolved = match features::resolve(project, &catalog) {
            Ok(resolved) => resolved,
            Err(e) => {
                println!("{} {}: {}", emoji(&out, "❌", "[ERR]"), project.name, e);
                problems += 1;
                continue;
            }
        };

        let mut project_ok = true;
        for feature in &resolved {
            let def = feature.definition;
            for path in def.files.iter().chain(def.template_files.iter()) {
                if let Err(e) = features::render_path(def, path, project) {
                    println!("{} {}: {}", emoji(&out, "❌", "[ERR]"), project.name, e);
                    problems += 1;
                    project_ok = false;
                }
            }
        }

        let definitions: Vec<&FeatureDefinition> = resolved.iter().map(|f| f.definition).collect();
        for conflict in ownership::detect(&definitions).conflicts {
            println!(
                "{} {}: {} is claimed by {}",
                emoji(&out, "⚠️ ", "[WARN]"),
                project.name,
                conflict.path,
                conflict.owners.join(", ")
            );
            warnings += 1;
        }

        if project_ok {
            println!(
                "{} {}: {} feature(s) resolve",
                emoji(&out, "✅", "[OK]"),
                project.name,
                resolved.len()
            );
        }
    }

    if problems > 0 {
        anyhow::bail!("Validation failed with {} problem(s)", problems);
    }
    println!(
        "\n{} Workspace is valid{}",
        emoji(&out, "🎉", "[DONE]"),
        if warnings > 0 {
            format!(" ({} warning(s))", warnings)
        } else {
            String::new()
        }
    );
    Ok(Outcome::from_findings(warnings > 0))
}
