//! # Status Command Implementation
//!
//! Reports drift between each project and the feature templates it
//! declares: missing files, mismatched files (with the feature version they
//! appear to match, if any), ownership and JSON merge conflicts, and
//! template errors.
//!
//! Projects are checked in parallel and reported in config order. This
//! command is read-only.

use anyhow::Result;
use clap::Args;

use feature_sync::features::FeatureCatalog;
use feature_sync::output::{render_status, OutputConfig};
use feature_sync::status::{self, ProjectStatus};

use super::{load_workspace, select_projects, Outcome, RootArg};

/// Show drift between projects and their feature templates
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub root: RootArg,

    /// Only check these projects (repeatable).
    #[arg(short, long = "project", value_name = "NAME")]
    pub projects: Vec<String>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the `status` command.
///
/// Returns [`Outcome::Findings`] when any checked project is not up to date.
/// A project whose status cannot be computed at all (bad path, undefined
/// feature) makes the whole run fail after the others are reported.
pub fn execute(args: StatusArgs, color_flag: &str) -> Result<Outcome> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let workspace = load_workspace(&args.root.root)?;
    let projects = select_projects(&workspace, &args.projects)?;
    let catalog = FeatureCatalog::new(workspace.features);

    let mut reports: Vec<ProjectStatus> = Vec::new();
    let mut failures = Vec::new();
    for (project, result) in projects.iter().zip(status::status_all(&projects, &catalog)) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => failures.push(format!("{}: {}", project.name, e)),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print!("{}", render_status(report, &out));
        }
    }

    if !failures.is_empty() {
        anyhow::bail!(
            "{} project(s) could not be checked:\n  {}",
            failures.len(),
            failures.join("\n  ")
        );
    }
    Ok(Outcome::from_findings(reports.iter().any(|r| !r.ok)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::write_workspace;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn args(root: PathBuf, projects: Vec<String>) -> StatusArgs {
        StatusArgs {
            root: RootArg { root },
            projects,
            json: false,
        }
    }

    #[test]
    fn test_status_reports_missing_file() {
        let temp = TempDir::new().unwrap();
        write_workspace(temp.path());

        let outcome = execute(args(temp.path().to_path_buf(), vec![]), "never").unwrap();
        assert_eq!(outcome, Outcome::Findings);
    }

    #[test]
    fn test_status_clean_project() {
        let temp = TempDir::new().unwrap();
        write_workspace(temp.path());
        fs::write(temp.path().join("repos/web/.eslintrc"), "root: true\n").unwrap();

        let outcome = execute(args(temp.path().to_path_buf(), vec!["web".to_string()]), "never")
            .unwrap();
        assert_eq!(outcome, Outcome::Clean);
    }

    #[test]
    fn test_status_missing_project_dir_fails() {
        let temp = TempDir::new().unwrap();
        write_workspace(temp.path());
        fs::remove_dir_all(temp.path().join("repos/web")).unwrap();

        let err = execute(args(temp.path().to_path_buf(), vec![]), "never").unwrap_err();
        assert!(err.to_string().contains("could not be checked"));
    }

    #[test]
    fn test_status_unknown_project() {
        let temp = TempDir::new().unwrap();
        write_workspace(temp.path());

        let err = execute(args(temp.path().to_path_buf(), vec!["api".to_string()]), "never")
            .unwrap_err();
        assert!(err.to_string().contains("Unknown project: api"));
    }
}
