//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestWorkspace::new()
//!     .with_feature("lint", "1.0.0", r#"{"files": [".eslintrc"]}"#, &[(".eslintrc", "root: true\n")])
//!     .with_project("web", r#"{"lint": "1.0.0"}"#);
//! fixture.command().arg("status").assert().code(1);
//! ```
//!
//! Layout created under the temporary root:
//!
//! ```text
//! projects/<name>.json              path = ../repos/<name>
//! features/<domain>/<version>/feature.json
//! features/<domain>/<version>/templates/...
//! repos/<name>/...
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::git_available;
    pub use super::TestWorkspace;
}

/// Whether a `git` executable is on PATH.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A temporary workspace with `projects/`, `features/` and `repos/`.
pub struct TestWorkspace {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("projects")
            .create_dir_all()
            .expect("Failed to create projects/");
        temp_dir
            .child("features")
            .create_dir_all()
            .expect("Failed to create features/");
        Self { temp_dir }
    }

    /// Add `features/<domain>/<version>/feature.json`.
    ///
    /// `body` is the JSON object without `domain` and `version`, which are
    /// filled in. `templates` are written under the feature's `templates/`.
    pub fn with_feature(
        self,
        domain: &str,
        version: &str,
        body: &str,
        templates: &[(&str, &str)],
    ) -> Self {
        let mut value: serde_json::Value =
            serde_json::from_str(body).expect("feature body must be JSON");
        let object = value.as_object_mut().expect("feature body must be an object");
        object.insert("domain".into(), domain.into());
        object.insert("version".into(), version.into());

        let dir = format!("features/{}/{}", domain, version);
        self.temp_dir
            .child(format!("{}/feature.json", dir))
            .write_str(&value.to_string())
            .expect("Failed to write feature.json");
        for (path, content) in templates {
            self.temp_dir
                .child(format!("{}/templates/{}", dir, path))
                .write_str(content)
                .expect("Failed to write template");
        }
        self
    }

    /// Add `projects/<name>.json` declaring `features` (a JSON object) and
    /// create its empty repository directory.
    pub fn with_project(self, name: &str, features: &str) -> Self {
        self.with_project_vars(name, features, "{}")
    }

    pub fn with_project_vars(self, name: &str, features: &str, vars: &str) -> Self {
        let config = format!(
            r#"{{"name": "{name}", "path": "../repos/{name}", "templateVars": {vars}, "features": {features}}}"#
        );
        self.temp_dir
            .child(format!("projects/{}.json", name))
            .write_str(&config)
            .expect("Failed to write project config");
        self.temp_dir
            .child(format!("repos/{}", name))
            .create_dir_all()
            .expect("Failed to create repo dir");
        self
    }

    /// Write a file inside a project's repository.
    pub fn with_repo_file(self, project: &str, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(format!("repos/{}/{}", project, path))
            .write_str(content)
            .expect("Failed to write repo file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn repo(&self, project: &str) -> PathBuf {
        self.path().join("repos").join(project)
    }

    pub fn read_repo_file(&self, project: &str, path: &str) -> Option<String> {
        std::fs::read_to_string(self.repo(project).join(path)).ok()
    }

    /// A `feature-sync` command pointed at this workspace with colors off.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("feature-sync");
        cmd.env_remove("FEATURE_SYNC_ROOT")
            .env_remove("FEATURE_SYNC_STRATEGY")
            .env_remove("RUST_LOG")
            .arg("--color")
            .arg("never")
            .current_dir(self.path());
        cmd
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
