//! Directory enumeration for full scans.
//!
//! Walks a root depth-first, pruning excluded directories, and returns every
//! regular file that survives the filter. Errors on individual entries are
//! logged and counted; the walk carries on with the rest of the tree.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::filter::PathFilter;

/// Counters collected during one enumeration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    pub files_found: u64,
    pub excluded: u64,
    pub errors: u64,
}

/// Result of enumerating one root.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// Absolute paths of every non-excluded file.
    pub files: Vec<PathBuf>,
    pub stats: WalkStats,
}

/// Walks a root and yields all paths not excluded by `filter`.
///
/// Implementations must be best-effort: a failing subtree is skipped,
/// never reported as an error to the caller.
pub trait FileEnumerator: Send + Sync {
    /// Enumerate files under `root`.
    fn files_under(&self, root: &Path, filter: &dyn PathFilter) -> Enumeration;
}

/// `walkdir`-backed enumerator.
#[derive(Debug, Clone, Default)]
pub struct WalkEnumerator {
    follow_links: bool,
}

impl WalkEnumerator {
    /// Create an enumerator.
    #[must_use]
    pub fn new(follow_links: bool) -> Self {
        Self { follow_links }
    }
}

impl FileEnumerator for WalkEnumerator {
    fn files_under(&self, root: &Path, filter: &dyn PathFilter) -> Enumeration {
        let mut out = Enumeration::default();
        let excluded = Cell::new(0u64);

        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                let skip = filter.is_excluded(relative, entry.file_type().is_dir());
                if skip {
                    excluded.set(excluded.get() + 1);
                }
                !skip
            });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        out.stats.files_found += 1;
                        out.files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = ?e.path(),
                        error = %e,
                        "Skipping unreadable entry"
                    );
                    out.stats.errors += 1;
                }
            }
        }

        out.stats.excluded = excluded.get();
        tracing::debug!(
            root = %root.display(),
            found = out.stats.files_found,
            excluded = out.stats.excluded,
            errors = out.stats.errors,
            "Enumeration complete"
        );

        out
    }
}
