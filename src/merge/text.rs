//! Three-way text merge
//!
//! The sync planner merges an old template (base), the project's file (local)
//! and the new template (remote) through the [`ThreeWayMerge`] trait, so the
//! algorithm can be swapped without touching planning. [`GitMergeFile`] is the
//! default implementation and shells out to `git merge-file`.

use std::fs;
use std::path::Path;
use std::process::Command;

use log::debug;
use tempfile::TempDir;

use crate::error::{Error, Result};

/// Outcome of a three-way merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMerge {
    /// Merged content, with conflict markers when `has_conflict` is set
    pub content: String,
    pub has_conflict: bool,
}

/// A three-way text merge capability
pub trait ThreeWayMerge {
    /// Merge `local` and `remote`, both derived from `base`.
    ///
    /// Textual conflicts are reported through [`TextMerge::has_conflict`];
    /// `Err` means the merge could not be run at all.
    fn merge(&self, base: &str, local: &str, remote: &str) -> Result<TextMerge>;
}

/// Runs `git merge-file -p` on three scratch files.
///
/// The scratch directory lives in a [`TempDir`] and is removed when the merge
/// returns, whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct GitMergeFile {
    program: String,
}

impl Default for GitMergeFile {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitMergeFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different `git` executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command_line(&self) -> String {
        format!(
            "{} merge-file -p -L local -L base -L template <local> <base> <template>",
            self.program
        )
    }
}

fn write_scratch(dir: &Path, name: &str, content: &str) -> Result<std::path::PathBuf> {
    let path = dir.join(name);
    fs::write(&path, content).map_err(|e| Error::Filesystem {
        message: format!("Failed to write merge scratch file '{}': {}", path.display(), e),
    })?;
    Ok(path)
}

impl ThreeWayMerge for GitMergeFile {
    fn merge(&self, base: &str, local: &str, remote: &str) -> Result<TextMerge> {
        let scratch = TempDir::new()?;
        let local_path = write_scratch(scratch.path(), "local", local)?;
        let base_path = write_scratch(scratch.path(), "base", base)?;
        let remote_path = write_scratch(scratch.path(), "template", remote)?;

        let output = Command::new(&self.program)
            .arg("merge-file")
            .arg("-p")
            .args(["-L", "local", "-L", "base", "-L", "template"])
            .arg(&local_path)
            .arg(&base_path)
            .arg(&remote_path)
            .output()
            .map_err(|e| Error::MergeTool {
                command: self.command_line(),
                stderr: e.to_string(),
                exit_code: None,
            })?;

        let content = String::from_utf8_lossy(&output.stdout).into_owned();
        match output.status.code() {
            Some(0) => Ok(TextMerge {
                content,
                has_conflict: false,
            }),
            // git merge-file exits with the number of conflicts, capped at 127
            Some(n) if (1..=127).contains(&n) => {
                debug!("git merge-file reported {} conflict(s)", n);
                Ok(TextMerge {
                    content,
                    has_conflict: true,
                })
            }
            code => Err(Error::MergeTool {
                command: self.command_line(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                exit_code: code,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_merge() -> GitMergeFile {
        GitMergeFile::new()
    }

    #[test]
    #[cfg_attr(not(feature = "integration-tests"), ignore)]
    fn test_clean_merge_takes_remote_changes() {
        let merged = git_merge()
            .merge("a\nb\nc\n", "a\nb\nc\n", "a\nB\nc\n")
            .unwrap();
        assert!(!merged.has_conflict);
        assert_eq!(merged.content, "a\nB\nc\n");
    }

    #[test]
    #[cfg_attr(not(feature = "integration-tests"), ignore)]
    fn test_clean_merge_keeps_disjoint_local_edits() {
        let merged = git_merge()
            .merge(
                "one\ntwo\nthree\nfour\nfive\n",
                "ONE\ntwo\nthree\nfour\nfive\n",
                "one\ntwo\nthree\nfour\nFIVE\n",
            )
            .unwrap();
        assert!(!merged.has_conflict);
        assert_eq!(merged.content, "ONE\ntwo\nthree\nfour\nFIVE\n");
    }

    #[test]
    #[cfg_attr(not(feature = "integration-tests"), ignore)]
    fn test_conflict_produces_markers() {
        let merged = git_merge()
            .merge("value\n", "local\n", "remote\n")
            .unwrap();
        assert!(merged.has_conflict);
        assert!(merged.content.contains("<<<<<<< local"));
        assert!(merged.content.contains(">>>>>>> template"));
    }

    #[test]
    fn test_missing_program_is_merge_tool_error() {
        let err = GitMergeFile::with_program("definitely-not-a-real-git-binary")
            .merge("a", "b", "c")
            .unwrap_err();
        match err {
            Error::MergeTool {
                command, exit_code, ..
            } => {
                assert!(command.starts_with("definitely-not-a-real-git-binary merge-file"));
                assert_eq!(exit_code, None);
            }
            other => panic!("Expected MergeTool error, got {other:?}"),
        }
    }
}
