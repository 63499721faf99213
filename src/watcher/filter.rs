//! Ignore rules with gitignore support.
//!
//! Rules are rebuilt from disk at the start of every scan so edits to ignore
//! files take effect on the next rescan. A source that cannot be read or
//! parsed contributes nothing rather than failing the scan.

use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;

use crate::Config;

/// Version-control and metadata directories that are never indexed.
const ALWAYS_EXCLUDED_DIRS: &[&str] = &[".git", ".hg", ".svn", ".bzr", "CVS", "_darcs"];

/// Decides whether a root-relative path is excluded from the index.
pub trait PathFilter: Send + Sync {
    /// Returns `true` if `relative` (relative to the scan root) must be skipped.
    ///
    /// An excluded directory prunes its whole subtree.
    fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool;
}

impl<F> PathFilter for F
where
    F: Fn(&Path, bool) -> bool + Send + Sync,
{
    fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool {
        self(relative, is_dir)
    }
}

/// Produces the exclusion predicate for a root. Called once per scan.
pub trait IgnoreRuleProvider: Send + Sync {
    /// Load the rules that apply under `root`.
    fn load(&self, root: &Path) -> Arc<dyn PathFilter>;
}

/// Ignore rules loaded for one scan.
pub struct IgnoreRules {
    matchers: Vec<Gitignore>,
    failed_sources: usize,
}

impl fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("sources", &self.matchers.len())
            .field("failed_sources", &self.failed_sources)
            .finish()
    }
}

impl IgnoreRules {
    /// Rules that exclude nothing beyond the always-excluded directories.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            matchers: Vec::new(),
            failed_sources: 0,
        }
    }

    /// Number of sources that failed to load and were skipped.
    #[must_use]
    pub fn failed_sources(&self) -> usize {
        self.failed_sources
    }

    /// Number of sources that loaded successfully.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.matchers.len()
    }

    /// Check whether a root-relative path is excluded.
    #[must_use]
    pub fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool {
        if is_always_excluded(relative) {
            return true;
        }

        // Later sources override earlier ones, matching gitignore precedence.
        let mut excluded = false;
        for matcher in &self.matchers {
            match matcher.matched_path_or_any_parents(relative, is_dir) {
                Match::Ignore(_) => excluded = true,
                Match::Whitelist(_) => excluded = false,
                Match::None => {}
            }
        }
        excluded
    }
}

impl PathFilter for IgnoreRules {
    fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool {
        IgnoreRules::is_excluded(self, relative, is_dir)
    }
}

/// Loads gitignore-syntax rules from files at the workspace root plus a
/// fixed list of extra patterns.
#[derive(Debug, Clone)]
pub struct GitignoreRules {
    ignore_files: Vec<String>,
    patterns: Vec<String>,
}

impl GitignoreRules {
    /// Create a provider reading `ignore_files` (names relative to the root)
    /// and applying `patterns` on top.
    #[must_use]
    pub fn new(ignore_files: Vec<String>, patterns: Vec<String>) -> Self {
        Self {
            ignore_files,
            patterns,
        }
    }

    /// Create a provider from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ignore_files.clone(), config.ignore_patterns.clone())
    }

    /// Build the rules for `root`, failing open on every bad source.
    #[must_use]
    pub fn build(&self, root: &Path) -> IgnoreRules {
        let mut rules = IgnoreRules::empty();

        for name in &self.ignore_files {
            let path = root.join(name);
            if !path.exists() {
                continue;
            }

            let mut builder = GitignoreBuilder::new(root);
            if let Some(e) = builder.add(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable ignore file");
                rules.failed_sources += 1;
                continue;
            }
            match builder.build() {
                Ok(gi) => rules.matchers.push(gi),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed ignore file");
                    rules.failed_sources += 1;
                }
            }
        }

        if !self.patterns.is_empty() {
            let mut builder = GitignoreBuilder::new(root);
            for pattern in &self.patterns {
                if let Err(e) = builder.add_line(None, pattern) {
                    tracing::warn!(pattern = %pattern, error = %e, "Skipping invalid ignore pattern");
                    rules.failed_sources += 1;
                }
            }
            match builder.build() {
                Ok(gi) => rules.matchers.push(gi),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to build configured ignore patterns");
                    rules.failed_sources += 1;
                }
            }
        }

        tracing::debug!(
            root = %root.display(),
            sources = rules.source_count(),
            failed = rules.failed_sources,
            "Loaded ignore rules"
        );
        rules
    }
}

impl Default for GitignoreRules {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl IgnoreRuleProvider for GitignoreRules {
    fn load(&self, root: &Path) -> Arc<dyn PathFilter> {
        Arc::new(self.build(root))
    }
}

/// Check if any component of a relative path is an always-excluded directory.
fn is_always_excluded(relative: &Path) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|n| ALWAYS_EXCLUDED_DIRS.contains(&n)),
        _ => false,
    })
}
