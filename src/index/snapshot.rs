//! Immutable, case-insensitively sorted file lists.

use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Compare two paths ignoring case, falling back to a byte comparison so the
/// order is total and independent of locale.
#[must_use]
pub fn compare_case_insensitive(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// Convert `path` to a `/`-separated string relative to `root`.
///
/// Returns `None` if `path` is not under `root` or is `root` itself.
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// The result of one completed scan.
///
/// A snapshot is never modified after construction; a newer scan replaces it
/// wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    root: PathBuf,
    generation: u64,
    paths: Vec<String>,
}

impl Snapshot {
    /// Build a snapshot, sorting `paths` case-insensitively.
    #[must_use]
    pub fn new(root: PathBuf, generation: u64, mut paths: Vec<String>) -> Self {
        // Directory walks return entries in filesystem order.
        paths.sort_by(|a, b| compare_case_insensitive(a, b));
        paths.dedup();
        Self {
            root,
            generation,
            paths,
        }
    }

    /// Root the paths are relative to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root generation this snapshot was scanned for.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the snapshot holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// All paths, in case-insensitive order.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Exact membership test.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.paths
            .binary_search_by(|probe| compare_case_insensitive(probe, path))
            .is_ok()
    }

    /// Paths accepted by `predicate`, preserving snapshot order.
    pub fn search<F>(&self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        self.paths
            .iter()
            .filter(|p| predicate(p.as_str()))
            .cloned()
            .collect()
    }
}

/// Summary of the last completed scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub generation: u64,
    pub files: usize,
    pub excluded: u64,
    pub errors: u64,
    pub elapsed_ms: u64,
    pub completed_at: DateTime<Utc>,
}
