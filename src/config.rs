//! # Configuration Model and Loading
//!
//! This module defines the two kinds of configuration the engine consumes and
//! the logic for loading them from a directory tree.
//!
//! ## Key Components
//!
//! - **`ProjectConfig`**: one managed repository: its name, root path,
//!   template variables and the `{domain: version}` features it declares, in
//!   declaration order.
//!
//! - **`FeatureDefinition`**: one `(domain, version)` bundle of canonical
//!   files, together with the template contents read from its template root,
//!   its presence-only rules, JSON merge fragments, symlinks and rename/delete
//!   migrations.
//!
//! - **`Workspace`**: everything loaded from a config root:
//!
//!   ```text
//!   <root>/projects/*.json|yaml           one ProjectConfig each
//!   <root>/features/**/feature.json|yaml  one FeatureDefinition each
//!   ```
//!
//! ## Parsing
//!
//! Files are parsed in two steps. The raw JSON or YAML is first deserialized
//! into loosely-shaped `Raw*` structs, then validated into the public types.
//! A parse either yields a fully valid value or an `Error::ConfigParse` that
//! names the file and field; there is no partially-valid configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::filesystem::{File, MemoryFS};

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

fn parse_value(content: &str, format: ConfigFormat, source: &Path) -> Result<Value> {
    let value = match format {
        ConfigFormat::Json => serde_json::from_str::<Value>(content).map_err(|e| {
            Error::config(format!("{}: invalid JSON: {}", source.display(), e))
        })?,
        ConfigFormat::Yaml => serde_yaml::from_str::<Value>(content).map_err(|e| {
            Error::config(format!("{}: invalid YAML: {}", source.display(), e))
        })?,
    };
    if !value.is_object() {
        return Err(Error::config(format!(
            "{}: expected an object at the top level",
            source.display()
        )));
    }
    Ok(value)
}

/// A `(domain, version)` pair declared by a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRef {
    pub domain: String,
    pub version: String,
}

impl FeatureRef {
    pub fn new(domain: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            version: version.into(),
        }
    }

    /// The `domain@version` key used to name owners in reports.
    pub fn owner_key(&self) -> String {
        format!("{}@{}", self.domain, self.version)
    }

    /// Parse a `domain@version` string.
    pub fn parse(input: &str) -> Result<Self> {
        match input.split_once('@') {
            Some((domain, version)) if !domain.is_empty() && !version.is_empty() => {
                Ok(Self::new(domain, version))
            }
            _ => Err(Error::ConfigParse {
                message: format!("Invalid feature reference: '{}'", input),
                hint: Some("Use the form <domain>@<version>, e.g. lint@1.2.0".to_string()),
            }),
        }
    }
}

/// One managed repository
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Unique project name
    pub name: String,
    /// Repository root
    pub path: PathBuf,
    /// Placeholder values used when rendering templates
    pub template_vars: BTreeMap<String, String>,
    /// Declared features in declaration order
    pub features: Vec<FeatureRef>,
    /// File this config was loaded from, if any
    pub config_file: Option<PathBuf>,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            template_vars: BTreeMap::new(),
            features: Vec::new(),
            config_file: None,
        }
    }

    pub fn with_feature(mut self, domain: &str, version: &str) -> Self {
        self.features.push(FeatureRef::new(domain, version));
        self
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.template_vars
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Parse a project config from a string.
    ///
    /// `source` is used in error messages and to resolve a relative `path`.
    pub fn parse(content: &str, format: ConfigFormat, source: &Path) -> Result<Self> {
        let value = parse_value(content, format, source)?;
        let raw: RawProjectConfig = serde_json::from_value(value).map_err(|e| {
            Error::config(format!("{}: {}", source.display(), e))
        })?;
        raw.validate(source)
    }

    /// Load a project config from a JSON or YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::config(format!(
                "{}: unsupported config file extension",
                path.display()
            ))
        })?;
        let content = fs::read_to_string(path)?;
        let mut project = Self::parse(&content, format, path)?;
        project.config_file = Some(path.to_path_buf());
        Ok(project)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProjectConfig {
    name: Option<String>,
    path: Option<String>,
    #[serde(default)]
    template_vars: BTreeMap<String, String>,
    #[serde(default)]
    features: Value,
}

impl RawProjectConfig {
    fn validate(self, source: &Path) -> Result<ProjectConfig> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(Error::ConfigParse {
                    message: format!("{}: missing field 'name'", source.display()),
                    hint: Some("Every project needs a unique \"name\"".to_string()),
                })
            }
        };

        let path = match self.path {
            Some(p) if !p.is_empty() => {
                let p = PathBuf::from(p);
                if p.is_absolute() {
                    p
                } else {
                    source.parent().unwrap_or_else(|| Path::new(".")).join(p)
                }
            }
            _ => {
                return Err(Error::config(format!(
                    "{}: missing field 'path'",
                    source.display()
                )))
            }
        };

        let features = match self.features {
            Value::Null => Vec::new(),
            Value::Object(map) => {
                let mut features = Vec::with_capacity(map.len());
                for (domain, version) in map {
                    match version {
                        Value::String(v) if !v.is_empty() => {
                            features.push(FeatureRef::new(domain, v));
                        }
                        // unquoted YAML versions such as `ci: 1.0` or `ci: 2`
                        Value::Number(n) => {
                            features.push(FeatureRef::new(domain, n.to_string()));
                        }
                        _ => {
                            return Err(Error::ConfigParse {
                                message: format!(
                                    "{}: features.{} must be a non-empty version string",
                                    source.display(),
                                    domain
                                ),
                                hint: Some("Quote the version, e.g. \"1.2.0\"".to_string()),
                            })
                        }
                    }
                }
                features
            }
            _ => {
                return Err(Error::ConfigParse {
                    message: format!("{}: 'features' must be an object", source.display()),
                    hint: Some(
                        "Declare features as {\"<domain>\": \"<version>\"}".to_string(),
                    ),
                })
            }
        };

        Ok(ProjectConfig {
            name,
            path,
            template_vars: self.template_vars,
            features,
            config_file: None,
        })
    }
}

/// Presence requirement for a rule-owned file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Exists,
}

/// A presence-only ownership rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRule {
    pub require: Requirement,
}

/// Paths a feature contributes JSON merge fragments to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMerge {
    #[serde(default)]
    pub json: Vec<String>,
}

/// A symbolic link a feature owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub path: String,
    pub target: String,
}

/// Renames and deletes introduced by one feature version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub renames: BTreeMap<String, String>,
    #[serde(default)]
    pub deletes: Vec<String>,
}

/// One `(domain, version)` feature bundle
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDefinition {
    #[serde(alias = "name")]
    pub domain: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(skip)]
    pub template_root: PathBuf,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub template_files: Vec<String>,
    #[serde(default)]
    pub file_rules: BTreeMap<String, FileRule>,
    #[serde(default)]
    pub file_merge: FileMerge,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub changes: BTreeMap<String, ChangeSet>,
    #[serde(default)]
    pub ignored_template_variables: BTreeSet<String>,
    /// Template and fragment contents keyed by repo-relative path
    #[serde(skip)]
    pub templates: MemoryFS,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTemplateRoot {
    #[serde(default)]
    template_root: Option<String>,
}

impl FeatureDefinition {
    pub fn new(domain: &str, version: &str) -> Self {
        Self {
            domain: domain.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    /// The `domain@version` owner key.
    pub fn owner_key(&self) -> String {
        format!("{}@{}", self.domain, self.version)
    }

    /// Whether this version declares `path` as a template file.
    pub fn declares_file(&self, path: &str) -> bool {
        self.files.iter().any(|f| f == path)
    }

    pub fn with_file(mut self, path: &str, template: &str) -> Self {
        self.files.push(path.to_string());
        self.templates.add_file_string(path, template);
        self
    }

    pub fn with_template_file(mut self, path: &str, template: &str) -> Self {
        self.template_files.push(path.to_string());
        self.templates.add_file_string(path, template);
        self
    }

    pub fn with_rule(mut self, path: &str) -> Self {
        self.file_rules.insert(
            path.to_string(),
            FileRule {
                require: Requirement::Exists,
            },
        );
        self
    }

    pub fn with_json_merge(mut self, path: &str, fragment: &str) -> Self {
        self.file_merge.json.push(path.to_string());
        self.templates.add_file_string(path, fragment);
        self
    }

    pub fn with_link(mut self, path: &str, target: &str) -> Self {
        self.links.push(LinkSpec {
            path: path.to_string(),
            target: target.to_string(),
        });
        self
    }

    pub fn with_change(mut self, version: &str, renames: &[(&str, &str)], deletes: &[&str]) -> Self {
        self.changes.insert(
            version.to_string(),
            ChangeSet {
                renames: renames
                    .iter()
                    .map(|(from, to)| (from.to_string(), to.to_string()))
                    .collect(),
                deletes: deletes.iter().map(|d| d.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_ignored_var(mut self, name: &str) -> Self {
        self.ignored_template_variables.insert(name.to_string());
        self
    }

    /// Parse a feature definition without touching the disk.
    ///
    /// `source` is used in error messages and to resolve `templateRoot`.
    pub fn parse(content: &str, format: ConfigFormat, source: &Path) -> Result<Self> {
        let value = parse_value(content, format, source)?;
        let root: RawTemplateRoot = serde_json::from_value(value.clone())
            .map_err(|e| Error::config(format!("{}: {}", source.display(), e)))?;
        let mut def: FeatureDefinition = serde_json::from_value(value)
            .map_err(|e| Error::config(format!("{}: {}", source.display(), e)))?;

        if def.domain.trim().is_empty() {
            return Err(Error::config(format!(
                "{}: 'domain' must not be empty",
                source.display()
            )));
        }
        if def.version.trim().is_empty() {
            return Err(Error::config(format!(
                "{}: 'version' must not be empty",
                source.display()
            )));
        }
        for version in def.changes.keys() {
            if version.trim().is_empty() {
                return Err(Error::config(format!(
                    "{}: changes keys must be versions",
                    source.display()
                )));
            }
        }

        def.check_paths(source)?;

        let base = source.parent().unwrap_or_else(|| Path::new("."));
        def.template_root = base.join(root.template_root.as_deref().unwrap_or("templates"));
        Ok(def)
    }

    /// Every repo-relative path this definition names must stay inside the
    /// project root: no absolute paths and no `..` components.
    fn check_paths(&self, source: &Path) -> Result<()> {
        let mut named: Vec<(String, &str)> = Vec::new();
        named.extend(self.files.iter().map(|p| ("files".to_string(), p.as_str())));
        named.extend(
            self.template_files
                .iter()
                .map(|p| ("templateFiles".to_string(), p.as_str())),
        );
        named.extend(self.file_rules.keys().map(|p| ("fileRules".to_string(), p.as_str())));
        named.extend(
            self.file_merge
                .json
                .iter()
                .map(|p| ("fileMerge.json".to_string(), p.as_str())),
        );
        named.extend(self.links.iter().map(|l| ("links.path".to_string(), l.path.as_str())));
        for (version, change) in &self.changes {
            for (from, to) in &change.renames {
                let field = format!("changes.{}.renames", version);
                named.push((field.clone(), from.as_str()));
                named.push((field, to.as_str()));
            }
            named.extend(
                change
                    .deletes
                    .iter()
                    .map(|p| (format!("changes.{}.deletes", version), p.as_str())),
            );
        }

        for (field, path) in named {
            if !is_repo_relative(path) {
                return Err(Error::ConfigParse {
                    message: format!(
                        "{}: {} entry '{}' is not a path inside the project",
                        source.display(),
                        field,
                        path
                    ),
                    hint: Some(
                        "Use paths relative to the project root without '..' segments".to_string(),
                    ),
                });
            }
        }
        Ok(())
    }

    /// Load a feature definition file, expand its globs and read its
    /// templates into memory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::config(format!(
                "{}: unsupported config file extension",
                path.display()
            ))
        })?;
        let content = fs::read_to_string(path)?;
        let mut def = Self::parse(&content, format, path)?;

        def.files = expand_patterns(&def.template_root, &def.files, false)?;
        def.template_files = expand_patterns(&def.template_root, &def.template_files, true)?;
        def.load_templates()?;
        debug!(
            "Loaded feature {} ({} files) from {}",
            def.owner_key(),
            def.files.len(),
            path.display()
        );
        Ok(def)
    }

    fn load_templates(&mut self) -> Result<()> {
        let paths: Vec<String> = self
            .files
            .iter()
            .chain(self.template_files.iter())
            .chain(self.file_merge.json.iter())
            .cloned()
            .collect();
        for rel in paths {
            let full = self.template_root.join(&rel);
            if full.is_file() {
                let content = fs::read(&full).map_err(|e| Error::Filesystem {
                    message: format!("Failed to read template '{}': {}", full.display(), e),
                })?;
                self.templates.add_file(rel, File::new(content));
            }
        }
        Ok(())
    }
}

/// Whether `path` is a non-empty relative path that cannot climb out of the
/// directory it is joined to.
pub fn is_repo_relative(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expand glob patterns relative to `root` into sorted relative file paths.
///
/// Literal paths are kept as they are, even when absent, so the resolver can
/// report the missing template. A glob that matches nothing is dropped, or is
/// an error when `required` is set.
fn expand_patterns(root: &Path, patterns: &[String], required: bool) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for pattern in patterns {
        if !is_glob(pattern) {
            if !out.contains(pattern) {
                out.push(pattern.clone());
            }
            continue;
        }

        let full = root.join(pattern);
        let mut matched: Vec<String> = Vec::new();
        for entry in glob::glob(&full.to_string_lossy())? {
            let entry = entry.map_err(|e| Error::Filesystem {
                message: format!("Failed to expand '{}': {}", pattern, e),
            })?;
            if !entry.is_file() {
                continue;
            }
            if let Ok(rel) = entry.strip_prefix(root) {
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                matched.push(rel);
            }
        }
        matched.sort();

        if matched.is_empty() && required {
            return Err(Error::ConfigParse {
                message: format!(
                    "Pattern '{}' matched no files under {}",
                    pattern,
                    root.display()
                ),
                hint: Some("templateFiles patterns must match at least one file".to_string()),
            });
        }
        for rel in matched {
            if !out.contains(&rel) {
                out.push(rel);
            }
        }
    }
    Ok(out)
}

/// All projects and feature definitions under a config root
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub root: PathBuf,
    pub projects: Vec<ProjectConfig>,
    pub features: Vec<FeatureDefinition>,
}

impl Workspace {
    /// Load `<root>/projects` and `<root>/features`.
    pub fn load(root: &Path) -> Result<Self> {
        let projects_dir = root.join("projects");
        let features_dir = root.join("features");
        if !projects_dir.is_dir() && !features_dir.is_dir() {
            return Err(Error::ConfigParse {
                message: format!("No projects/ or features/ directory in {}", root.display()),
                hint: Some("Point --root at the directory holding your config".to_string()),
            });
        }

        let mut projects = Vec::new();
        if projects_dir.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(&projects_dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && ConfigFormat::from_path(p).is_some())
                .collect();
            entries.sort();
            for path in entries {
                let project = ProjectConfig::from_file(&path)?;
                if projects.iter().any(|p: &ProjectConfig| p.name == project.name) {
                    return Err(Error::config(format!(
                        "{}: duplicate project name '{}'",
                        path.display(),
                        project.name
                    )));
                }
                projects.push(project);
            }
        }

        let mut features = Vec::new();
        if features_dir.is_dir() {
            let mut defs: Vec<PathBuf> = WalkDir::new(&features_dir)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| {
                    p.file_stem().and_then(|s| s.to_str()) == Some("feature")
                        && ConfigFormat::from_path(p).is_some()
                })
                .collect();
            defs.sort();
            for path in defs {
                let def = FeatureDefinition::from_file(&path)?;
                if features.iter().any(|f: &FeatureDefinition| {
                    f.domain == def.domain
                        && crate::version::versions_equal(&f.version, &def.version)
                }) {
                    return Err(Error::config(format!(
                        "{}: duplicate feature {}",
                        path.display(),
                        def.owner_key()
                    )));
                }
                features.push(def);
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            projects,
            features,
        })
    }

    /// Find a project by name.
    pub fn project(&self, name: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.name == name)
    }
}

/// Set `features[domain] = version` in a project's JSON config file.
///
/// Every other key is preserved in its original order; a new domain is
/// appended. The file is rewritten with two-space indentation and a trailing
/// newline.
pub fn set_project_feature(config_file: &Path, domain: &str, version: &str) -> Result<()> {
    if ConfigFormat::from_path(config_file) != Some(ConfigFormat::Json) {
        return Err(Error::ConfigParse {
            message: format!("{}: only JSON project files can be rewritten", config_file.display()),
            hint: Some("Edit YAML project files by hand".to_string()),
        });
    }

    let content = fs::read_to_string(config_file)?;
    let mut value = parse_value(&content, ConfigFormat::Json, config_file)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| Error::config(format!("{}: expected an object", config_file.display())))?;

    let features = object
        .entry("features")
        .or_insert_with(|| Value::Object(Map::new()));
    if features.is_null() {
        *features = Value::Object(Map::new());
    }
    let features = features.as_object_mut().ok_or_else(|| {
        Error::config(format!(
            "{}: 'features' must be an object",
            config_file.display()
        ))
    })?;
    features.insert(domain.to_string(), Value::String(version.to_string()));

    fs::write(config_file, crate::merge::json::to_stable_string(&value)?)?;
    Ok(())
}
