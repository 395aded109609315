//! In-memory file tree used by status and sync planning
//!
//! Status and planning never touch the disk directly. The paths a pass needs
//! are first read into a [`MemoryFS`] snapshot (see [`snapshot`]), and the
//! engine works purely on that snapshot. This keeps the core testable without
//! temp directories and lets the planner stage renames and deletes on a copy
//! before deciding on writes.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use glob::Pattern;

use crate::error::{Error, Result};

/// A file in the snapshot: either regular content or a symbolic link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// File content as bytes (empty for symlinks)
    pub content: Vec<u8>,
    /// Link target when the path is a symbolic link
    pub link_target: Option<String>,
}

impl File {
    /// Create a new regular file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            link_target: None,
        }
    }

    /// Create a new regular file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    /// Create a symbolic link entry
    pub fn symlink(target: &str) -> Self {
        Self {
            content: Vec::new(),
            link_target: Some(target.to_string()),
        }
    }

    /// Whether the entry is a symbolic link
    pub fn is_symlink(&self) -> bool {
        self.link_target.is_some()
    }

    /// Content as UTF-8 text, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// In-memory filesystem keyed by repo-relative path (`/` separated)
#[derive(Debug, Clone, Default)]
pub struct MemoryFS {
    files: BTreeMap<String, File>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a file
    pub fn add_file(&mut self, path: impl Into<String>, file: File) {
        self.files.insert(path.into(), file);
    }

    /// Add a file with string content
    pub fn add_file_string(&mut self, path: impl Into<String>, content: &str) {
        self.add_file(path, File::from_string(content));
    }

    /// Get a file by path
    pub fn get_file(&self, path: &str) -> Option<&File> {
        self.files.get(path)
    }

    /// Get a regular file's content as text.
    ///
    /// Returns `Ok(None)` when the path is absent and an error when the entry
    /// exists but is not valid UTF-8.
    pub fn read_string(&self, path: &str) -> Result<Option<&str>> {
        match self.files.get(path) {
            Some(file) => file.as_str().map(Some).ok_or_else(|| Error::Filesystem {
                message: format!("File content is not valid UTF-8: {}", path),
            }),
            None => Ok(None),
        }
    }

    /// Remove a file
    pub fn remove_file(&mut self, path: &str) -> Option<File> {
        self.files.remove(path)
    }

    /// Check if a file exists
    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// List all paths in sorted order
    pub fn list_files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// List files matching a glob pattern
    pub fn list_files_glob(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = Pattern::new(pattern)?;
        Ok(self
            .files
            .keys()
            .filter(|path| pattern.matches(path))
            .cloned()
            .collect())
    }

    /// Rename a file
    pub fn rename_file(&mut self, from: &str, to: &str) -> Result<()> {
        match self.files.remove(from) {
            Some(file) => {
                self.files.insert(to.to_string(), file);
                Ok(())
            }
            None => Err(Error::Filesystem {
                message: format!("File not found: {}", from),
            }),
        }
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all files as (path, file) pairs
    pub fn files(&self) -> impl Iterator<Item = (&String, &File)> {
        self.files.iter()
    }
}

/// Read the given repo-relative paths under `root` into a snapshot.
///
/// Absent paths are simply not present in the result. Symbolic links are
/// recorded with their target and never followed. Directories are skipped.
pub fn snapshot<'a, I>(root: &Path, paths: I) -> Result<MemoryFS>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tree = MemoryFS::new();
    for rel in paths {
        if tree.exists(rel) {
            continue;
        }
        let full = root.join(rel);
        let meta = match fs::symlink_metadata(&full) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(Error::Filesystem {
                    message: format!("Failed to stat '{}': {}", full.display(), e),
                })
            }
        };

        if meta.file_type().is_symlink() {
            let target = fs::read_link(&full).map_err(|e| Error::Filesystem {
                message: format!("Failed to read link '{}': {}", full.display(), e),
            })?;
            tree.add_file(rel, File::symlink(&target.to_string_lossy()));
        } else if meta.is_file() {
            let content = fs::read(&full).map_err(|e| Error::Filesystem {
                message: format!("Failed to read file '{}': {}", full.display(), e),
            })?;
            tree.add_file(rel, File::new(content));
        }
    }
    Ok(tree)
}
