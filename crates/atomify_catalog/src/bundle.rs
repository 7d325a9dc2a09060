//! # Resource Bundles
//!
//! Where catalog bytes come from. The loader and image workers only see the
//! [`ResourceBundle`] trait; paths are `/`-separated and relative to the
//! bundle root.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Read-only view over packaged resources.
///
/// Shared across image worker threads, hence `Send + Sync`.
pub trait ResourceBundle: Send + Sync {
    /// Reads a whole resource.
    ///
    /// # Errors
    ///
    /// `NotFound` if the resource does not exist, otherwise whatever the
    /// underlying storage reports.
    fn read(&self, rel_path: &str) -> io::Result<Vec<u8>>;

    /// Returns true if `rel_path` names a resource or a directory.
    fn contains(&self, rel_path: &str) -> bool;

    /// Names of the direct children of directory `rel_path`, sorted.
    ///
    /// # Errors
    ///
    /// `NotFound` if the directory does not exist.
    fn list(&self, rel_path: &str) -> io::Result<Vec<String>>;
}

/// Resources stored as files under a root directory.
#[derive(Clone, Debug)]
pub struct DirectoryBundle {
    root: PathBuf,
}

impl DirectoryBundle {
    /// Creates a bundle rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps `rel_path` under the root.
    ///
    /// `..` segments are refused so manifest URLs cannot escape the root.
    fn full_path(&self, rel_path: &str) -> io::Result<PathBuf> {
        let mut path = self.root.clone();
        for part in rel_path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{rel_path} leaves the bundle root"),
                    ))
                }
                part => path.push(part),
            }
        }
        Ok(path)
    }
}

impl ResourceBundle for DirectoryBundle {
    fn read(&self, rel_path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.full_path(rel_path)?)
    }

    fn contains(&self, rel_path: &str) -> bool {
        self.full_path(rel_path).is_ok_and(|path| path.exists())
    }

    fn list(&self, rel_path: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.full_path(rel_path)?)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

/// Resources held in memory, keyed by path.
///
/// Directories are implied by the keys: `a/b.json` makes `a` a directory.
#[derive(Clone, Debug, Default)]
pub struct MemoryBundle {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource, replacing any previous bytes at that path.
    pub fn insert(&mut self, rel_path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(rel_path.into(), bytes.into());
    }

    /// Builder form of [`MemoryBundle::insert`].
    #[must_use]
    pub fn with(mut self, rel_path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(rel_path, bytes);
        self
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the bundle holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn dir_prefix(rel_path: &str) -> String {
        let trimmed = rel_path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        }
    }
}

impl ResourceBundle for MemoryBundle {
    fn read(&self, rel_path: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(rel_path.trim_start_matches('/'))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, rel_path.to_string()))
    }

    fn contains(&self, rel_path: &str) -> bool {
        let path = rel_path.trim_start_matches('/');
        if path.is_empty() {
            return false;
        }
        let prefix = Self::dir_prefix(path);
        self.files.contains_key(path) || self.files.keys().any(|k| k.starts_with(&prefix))
    }

    fn list(&self, rel_path: &str) -> io::Result<Vec<String>> {
        let prefix = Self::dir_prefix(rel_path);
        let mut names: Vec<String> = self
            .files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(ToString::to_string)
            .collect();
        names.sort();
        names.dedup();

        if names.is_empty() {
            return Err(io::Error::new(io::ErrorKind::NotFound, rel_path.to_string()));
        }
        Ok(names)
    }
}
