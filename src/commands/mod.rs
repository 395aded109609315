//! # CLI Command Implementations
//!
//! One file per subcommand of the `feature-sync` tool. Each command module
//! contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `feature_sync` library.
//!
//! `execute` returns an [`Outcome`] when the run completed, so `main` can
//! tell "nothing to report" apart from "drift or conflicts found". Fatal
//! errors come back as `Err` instead.

pub mod add;
pub mod completions;
pub mod explain;
pub mod status;
pub mod sync;
pub mod validate;

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use feature_sync::config::{ProjectConfig, Workspace};
use feature_sync::suggestions;

/// How a command run finished, when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to report
    Clean,
    /// Drift, conflicts or blocked projects were found
    Findings,
}

impl Outcome {
    pub fn from_findings(found: bool) -> Self {
        if found {
            Outcome::Findings
        } else {
            Outcome::Clean
        }
    }
}

/// Location of the workspace (`projects/` and `features/`)
#[derive(Args, Debug, Clone)]
pub struct RootArg {
    /// Directory holding projects/ and features/.
    ///
    /// Can also be set with the `FEATURE_SYNC_ROOT` environment variable.
    #[arg(
        short,
        long,
        value_name = "DIR",
        env = "FEATURE_SYNC_ROOT",
        default_value = "."
    )]
    pub root: PathBuf,
}

/// Load the workspace at `root`, with a hinted error when there is none.
pub fn load_workspace(root: &Path) -> Result<Workspace> {
    if !root.join("projects").is_dir() && !root.join("features").is_dir() {
        return Err(suggestions::workspace_not_found(root));
    }
    Ok(Workspace::load(root)?)
}

/// Pick the projects named by `-p` filters, or all of them when none are
/// given. Filtered projects keep config order.
pub fn select_projects(workspace: &Workspace, names: &[String]) -> Result<Vec<ProjectConfig>> {
    let known: Vec<&str> = workspace.projects.iter().map(|p| p.name.as_str()).collect();
    for name in names {
        if workspace.project(name).is_none() {
            return Err(suggestions::unknown_project(name, &known));
        }
    }

    Ok(workspace
        .projects
        .iter()
        .filter(|p| names.is_empty() || names.contains(&p.name))
        .cloned()
        .collect())
}
