//! Applying a Sync Plan
//!
//! Carries out a [`SyncPlan`] against a project directory. A blocked plan is
//! refused before anything is touched. Otherwise the actions run in plan
//! order (renames, deletes, writes, links), creating parent directories as
//! needed.
//!
//! A plan naming a path outside the project root is refused up front as
//! well. A failure partway through is returned as-is; earlier actions are
//! not rolled back.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::info;
use serde::Serialize;

use crate::config::is_repo_relative;
use crate::error::{Error, Result};
use crate::plan::{SyncAction, SyncPlan};

/// Counts of applied actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub project: String,
    pub renamed: usize,
    pub deleted: usize,
    pub written: usize,
    pub linked: usize,
}

impl ApplyReport {
    pub fn total(&self) -> usize {
        self.renamed + self.deleted + self.written + self.linked
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
            message: format!("Failed to create directory '{}': {}", parent.display(), e),
        })?;
    }
    Ok(())
}

/// Remove a symlink (or file) at `path` if one is there.
fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Err(Error::Filesystem {
            message: format!("Refusing to replace directory '{}'", path.display()),
        }),
        Ok(_) => fs::remove_file(path).map_err(|e| Error::Filesystem {
            message: format!("Failed to remove '{}': {}", path.display(), e),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Filesystem {
            message: format!("Failed to stat '{}': {}", path.display(), e),
        }),
    }
}

#[cfg(unix)]
fn make_symlink(target: &str, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &str, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

fn action_paths(action: &SyncAction) -> Vec<&str> {
    match action {
        SyncAction::Rename { from, to } => vec![from.as_str(), to.as_str()],
        SyncAction::Delete { path }
        | SyncAction::Write { path, .. }
        | SyncAction::Link { path, .. } => vec![path.as_str()],
    }
}

fn apply_action(action: &SyncAction, root: &Path, report: &mut ApplyReport) -> Result<()> {
    match action {
        SyncAction::Rename { from, to } => {
            let dest = root.join(to);
            create_parent(&dest)?;
            fs::rename(root.join(from), &dest).map_err(|e| Error::Filesystem {
                message: format!("Failed to rename '{}' to '{}': {}", from, to, e),
            })?;
            report.renamed += 1;
        }
        SyncAction::Delete { path } => {
            remove_existing(&root.join(path))?;
            report.deleted += 1;
        }
        SyncAction::Write { path, content, .. } => {
            let full = root.join(path);
            create_parent(&full)?;
            // never write through a symlink
            if fs::symlink_metadata(&full)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false)
            {
                remove_existing(&full)?;
            }
            fs::write(&full, content).map_err(|e| Error::Filesystem {
                message: format!("Failed to write file '{}': {}", full.display(), e),
            })?;
            report.written += 1;
        }
        SyncAction::Link { path, target, .. } => {
            let full = root.join(path);
            create_parent(&full)?;
            remove_existing(&full)?;
            make_symlink(target, &full).map_err(|e| Error::Filesystem {
                message: format!("Failed to link '{}' -> '{}': {}", path, target, e),
            })?;
            report.linked += 1;
        }
    }
    info!("{}: {}", report.project, action);
    Ok(())
}

/// Apply `plan` under `root`.
///
/// # Errors
///
/// `Error::PlanBlocked` if the plan carries errors, in which case nothing is
/// written; otherwise the first failing file operation.
pub fn apply(plan: &SyncPlan, root: &Path) -> Result<ApplyReport> {
    if plan.is_blocked() {
        return Err(Error::PlanBlocked {
            project: plan.project.clone(),
            errors: plan.errors.clone(),
        });
    }
    if let Some(path) = plan
        .actions
        .iter()
        .flat_map(action_paths)
        .find(|p| !is_repo_relative(p))
    {
        return Err(Error::Filesystem {
            message: format!(
                "Refusing to touch '{}' outside project '{}'",
                path, plan.project
            ),
        });
    }

    let mut report = ApplyReport {
        project: plan.project.clone(),
        ..Default::default()
    };
    for action in &plan.actions {
        apply_action(action, root, &mut report)?;
    }
    Ok(report)
}
