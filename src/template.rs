//! Template rendering
//!
//! Feature templates use `{{name}}` placeholders, where `name` matches
//! `[A-Za-z0-9_-]+`. Rendering is fail-closed: every placeholder must be
//! either provided by the project's `templateVars` or listed in the feature's
//! `ignoredTemplateVariables`, otherwise nothing is substituted and the first
//! unresolved name is reported.
//!
//! Ignored placeholders are left verbatim. Substitution is a single pass, so
//! a value that itself looks like `{{other}}` is never expanded again.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{([A-Za-z0-9_-]+)\}\}").expect("placeholder pattern is valid")
    })
}

/// List placeholder names referenced by `content`, in order of first use.
pub fn placeholders(content: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();
    for caps in placeholder_regex().captures_iter(content) {
        let name = &caps[1];
        if seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }
    names
}

/// Render `content` with `vars`, leaving `ignored` placeholders untouched.
///
/// # Errors
///
/// Returns `Error::Template` naming the first placeholder that is neither in
/// `vars` nor in `ignored`.
///
/// # Examples
///
/// ```
/// use std::collections::{BTreeMap, BTreeSet};
/// use feature_sync::template::render;
///
/// let mut vars = BTreeMap::new();
/// vars.insert("name".to_string(), "web".to_string());
/// let out = render("app={{name}}", &vars, &BTreeSet::new()).unwrap();
/// assert_eq!(out, "app=web");
/// ```
pub fn render(
    content: &str,
    vars: &BTreeMap<String, String>,
    ignored: &BTreeSet<String>,
) -> Result<String> {
    for name in placeholders(content) {
        if !vars.contains_key(&name) && !ignored.contains(&name) {
            return Err(Error::Template {
                message: "Missing template variable".to_string(),
                variable: Some(name),
            });
        }
    }

    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for caps in placeholder_regex().captures_iter(content) {
        let whole = caps.get(0).expect("capture group 0 always exists");
        out.push_str(&content[last..whole.start()]);
        match vars.get(&caps[1]) {
            Some(value) => out.push_str(value),
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    out.push_str(&content[last..]);

    Ok(out)
}
