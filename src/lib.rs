//! # Feature Sync Library
//!
//! This library detects and reconciles drift between versioned *feature
//! templates* and the projects that declare them. It is used by the
//! `feature-sync` command-line tool but every operation is also available as
//! a plain function over in-memory data.
//!
//! ## Quick Example
//!
//! ```
//! use feature_sync::config::{FeatureDefinition, ProjectConfig};
//! use feature_sync::features::FeatureCatalog;
//! use feature_sync::filesystem::MemoryFS;
//! use feature_sync::status;
//!
//! let lint = FeatureDefinition::new("lint", "1.0.0").with_file(".eslintrc", "root: true\n");
//! let catalog = FeatureCatalog::new(vec![lint]);
//! let project = ProjectConfig::new("web", "/srv/web").with_feature("lint", "1.0.0");
//!
//! // Nothing on disk yet: the file is reported missing
//! let mut tree = MemoryFS::new();
//! let report = status::status(&project, &catalog, &tree).unwrap();
//! assert_eq!(report.missing.len(), 1);
//! assert!(!report.ok);
//!
//! tree.add_file_string(".eslintrc", "root: true\n");
//! let report = status::status(&project, &catalog, &tree).unwrap();
//! assert!(report.ok);
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: project configs, feature definitions and
//!   the on-disk workspace layout (`projects/`, `features/`).
//! - **Catalog (`features`)**: lookup of feature definitions by domain and
//!   version, and folding of per-version migrations.
//! - **Ownership (`ownership`)**: which feature owns which project path, and
//!   which paths are claimed by more than one feature.
//! - **In-Memory Filesystem (`filesystem`)**: snapshots of project files that
//!   status and planning work on, so neither reads the disk directly.
//! - **Merging (`merge`)**: ordered JSON fragment merging with conflict
//!   tracking, and three-way text merges through `git merge-file`.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: [`config::Workspace::load`] reads projects and features.
//! 2.  **Status**: [`status::status`] reports missing files, mismatches and
//!     conflicts for one project.
//! 3.  **Plan**: [`plan::plan`] turns drift into an ordered list of renames,
//!     deletes, writes and links.
//! 4.  **Apply**: [`apply::apply`] carries out a plan that has no errors.

pub mod apply;
pub mod config;
pub mod conflict;
pub mod error;
pub mod explain;
pub mod features;
pub mod filesystem;
pub mod merge;
pub mod output;
pub mod ownership;
pub mod plan;
pub mod status;
pub mod suggestions;
pub mod template;
pub mod version;

#[cfg(test)]
mod template_proptest;
#[cfg(test)]
mod version_proptest;
