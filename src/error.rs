//! # Error Handling
//!
//! This module defines the centralized error type for the `feature-sync`
//! library. It uses the `thiserror` library to describe every failure the
//! reconciliation engine can report, with enough context (file, field, path,
//! feature) for a caller to print the message verbatim.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum covering configuration errors, template
//!   errors, merge errors, merge tool failures, blocked plans and I/O.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Ownership conflicts and merge conflicts are *not* errors: they are data
//! carried by the status and sync reports. Only failures that stop an
//! operation are represented here.

use thiserror::Error;

/// Main error type for feature-sync operations
#[derive(Error, Debug)]
pub enum Error {
    /// A project or feature configuration file could not be parsed or failed
    /// validation.
    ///
    /// The message names the offending file and field. An optional hint
    /// explains how to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A project's root path is missing or is not a directory.
    #[error("Invalid path for project '{project}': {path}: {message}")]
    ProjectPath {
        project: String,
        path: String,
        message: String,
    },

    /// A project references a feature domain/version that is not defined.
    #[error("Feature not found: {domain}@{version}")]
    FeatureNotFound { domain: String, version: String },

    /// A feature declares a file whose template is absent on disk.
    #[error("Template file missing for {feature}: {path}")]
    TemplateMissing { feature: String, path: String },

    /// An error occurred during template rendering.
    ///
    /// Carries the name of the first unresolved placeholder when applicable.
    #[error("Template rendering error: {message}{}", variable.as_ref().map(|v| format!(" (variable: {})", v)).unwrap_or_default())]
    Template {
        message: String,
        /// The template variable that caused the error, if applicable
        variable: Option<String>,
    },

    /// An error occurred during a JSON merge.
    #[error("Merge operation error: {operation} - {message}")]
    Merge { operation: String, message: String },

    /// The external three-way merge tool could not be run, or exited with a
    /// status that does not mean "conflicts found".
    #[error("Failed to run merge tool `{command}`{}{}", exit_code.map(|c| format!(" (exit {})", c)).unwrap_or_default(), if stderr.is_empty() { String::new() } else { format!(": {}", stderr) })]
    MergeTool {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// A sync plan carries fatal errors, so nothing was applied.
    #[error("Sync plan for '{project}' is blocked: {}", errors.join("; "))]
    PlanBlocked {
        project: String,
        errors: Vec<String>,
    },

    /// An error occurred while reading or writing project files.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing or serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a configuration error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            hint: None,
        }
    }

    /// Whether this error is a template problem (missing file or variable).
    ///
    /// Read-only inspection reports these as `MISSING` markers instead of
    /// aborting.
    pub fn is_template_error(&self) -> bool {
        matches!(self, Error::TemplateMissing { .. } | Error::Template { .. })
    }
}
