//! # Error Suggestions
//!
//! Helpers for CLI errors that say what went wrong AND how to fix it. The
//! library reports [`crate::error::Error`] values; the commands wrap the
//! lookups they do themselves (project names, feature names, the workspace
//! root) with these so the user gets a hint instead of a bare message.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::suggestions;
//!
//! let project = workspace
//!     .project(name)
//!     .ok_or_else(|| suggestions::unknown_project(name, &known))?;
//! ```

use std::path::Path;

/// The workspace root has neither a `projects/` nor a `features/` directory.
pub fn workspace_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "No feature-sync workspace found at {path}\n\n\
         hint: A workspace contains projects/*.json and features/**/feature.json\n\
         hint: Use -r/--root to point at a different directory\n\
         hint: Set the FEATURE_SYNC_ROOT environment variable",
        path = path.display()
    )
}

/// A `-p/--project` filter names a project that is not configured.
pub fn unknown_project(name: &str, known: &[&str]) -> anyhow::Error {
    let did_you_mean = find_similar(name, known)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();
    let listing = if known.is_empty() {
        "No projects are configured".to_string()
    } else {
        format!("Configured projects: {}", known.join(", "))
    };

    anyhow::anyhow!("Unknown project: {name}{did_you_mean}\n\n{listing}")
}

/// A feature reference on the command line is not `domain@version`.
pub fn invalid_feature_ref(input: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid feature reference: '{input}'\n\n\
         hint: Use the form DOMAIN@VERSION, e.g. 'lint@2.0.0'\n\
         hint: Run 'feature-sync validate' to list the defined features"
    )
}

/// `domain@version` is not in the feature catalog.
///
/// Suggests the closest domain when the domain itself is unknown, or lists
/// the defined versions when only the version is wrong.
pub fn unknown_feature(domain: &str, version: &str, domains: &[&str], versions: &[&str]) -> anyhow::Error {
    let hint = if !versions.is_empty() {
        format!("hint: Defined versions of '{domain}': {}", versions.join(", "))
    } else if let Some(similar) = find_similar(domain, domains) {
        format!("hint: Did you mean '{similar}'?")
    } else if domains.is_empty() {
        "hint: No features are defined under features/".to_string()
    } else {
        format!("hint: Defined features: {}", domains.join(", "))
    };

    anyhow::anyhow!("Unknown feature: {domain}@{version}\n\n{hint}")
}

/// Find the closest candidate to `input` (edit distance of at most 2).
pub(crate) fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (candidate, edit_distance(input, candidate)))
        .filter(|&(_, distance)| distance <= 2 && distance < input.len())
        .min_by_key(|&(_, distance)| distance)
        .map(|(candidate, _)| candidate)
}

/// Levenshtein distance, computed one row at a time.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != *b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}
