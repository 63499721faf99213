//! Public query surface over the installed snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use regex::{Regex, RegexBuilder};

use super::listeners::{FileListListener, ListenerId};
use super::scheduler::{Collaborators, ScanScheduler};
use super::snapshot::{ScanReport, Snapshot};
use super::state::{IndexState, ScanCountersSnapshot};
use crate::watcher::{ChangeWatcher, GitignoreRules, NotifyWatcher, NullWatcher, WalkEnumerator};
use crate::{Config, Result};

/// Returned by [`FileIndex::count_or_unknown`] while no valid list exists.
pub const UNKNOWN_COUNT: i64 = -1;

/// Searchable list of a workspace's files, kept current by background rescans.
///
/// Queries never block on a scan and never fail: while a scan is pending
/// they report an unknown count and empty results.
pub struct FileIndex {
    scheduler: ScanScheduler,
}

impl FileIndex {
    /// Create an index using the filesystem-backed collaborators.
    ///
    /// If `config.root` is set the first scan is queued immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the background
    /// thread cannot be started.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let watcher: Box<dyn ChangeWatcher> = if config.watch {
            Box::new(NotifyWatcher::new(config.debounce))
        } else {
            Box::new(NullWatcher)
        };
        let index = Self::with_collaborators(Collaborators {
            rules: Arc::new(GitignoreRules::from_config(config)),
            enumerator: Arc::new(WalkEnumerator::new(config.follow_links)),
            watcher,
        })?;

        if let Some(root) = &config.root {
            index.on_root_changed(root)?;
        }
        Ok(index)
    }

    /// Create an index over custom collaborators. No root is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan worker cannot be started.
    pub fn with_collaborators(collaborators: Collaborators) -> Result<Self> {
        Ok(Self {
            scheduler: ScanScheduler::new(collaborators)?,
        })
    }

    /// Queue a full rescan.
    pub fn request_scan(&self) {
        self.scheduler.request_scan();
    }

    /// Switch the index to a new workspace root.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory.
    pub fn on_root_changed(&self, root: impl AsRef<Path>) -> Result<()> {
        self.scheduler.on_root_changed(root)
    }

    /// Rescan if `path` (relative to the root) is not in the list.
    pub fn ensure_indexed(&self, path: &str) {
        if !self.contains(path) {
            tracing::debug!(path, "Path not indexed, requesting rescan");
            self.scheduler.request_scan_for("ensure indexed");
        }
    }

    /// Number of indexed files, or [`UNKNOWN_COUNT`] while no valid list exists.
    #[must_use]
    pub fn count_or_unknown(&self) -> i64 {
        match self.snapshot() {
            Some(snapshot) => i64::try_from(snapshot.len()).unwrap_or(i64::MAX),
            None => UNKNOWN_COUNT,
        }
    }

    /// Paths accepted by `predicate`, in case-insensitive order.
    pub fn search<F>(&self, predicate: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        self.snapshot()
            .map(|snapshot| snapshot.search(predicate))
            .unwrap_or_default()
    }

    /// Paths matching a regular expression anywhere.
    ///
    /// Matching is case-insensitive unless the pattern contains an uppercase
    /// character.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn search_regex(&self, pattern: &str) -> Result<Vec<String>> {
        let regex = smart_case_regex(pattern)?;
        Ok(self.search(|path| regex.is_match(path)))
    }

    /// Whether `path` is in the current valid list.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.snapshot()
            .is_some_and(|snapshot| snapshot.contains(path))
    }

    /// Register a validity listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's delivery thread cannot be started.
    pub fn subscribe<L>(&self, listener: L) -> Result<ListenerId>
    where
        L: FileListListener + 'static,
    {
        self.scheduler.hub().subscribe(Arc::new(listener))
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.scheduler.hub().unsubscribe(id)
    }

    /// Block until every notification queued so far has been delivered.
    pub fn flush_notifications(&self) {
        self.scheduler.hub().flush();
    }

    /// Stop watching and scanning. Queries keep answering from the last state.
    pub fn dispose(&self) {
        self.scheduler.dispose();
    }

    /// Whether `dispose` has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.scheduler.is_disposed()
    }

    /// Current validity.
    #[must_use]
    pub fn state(&self) -> IndexState {
        self.scheduler.view().0
    }

    /// Whether the list reflects a completed scan.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state().is_valid()
    }

    /// The current workspace root.
    #[must_use]
    pub fn root(&self) -> Option<PathBuf> {
        self.scheduler.root()
    }

    /// The installed snapshot, if the index is valid.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        match self.scheduler.view() {
            (IndexState::Valid, snapshot) => snapshot,
            _ => None,
        }
    }

    /// Summary of the last scan installed for the current root.
    #[must_use]
    pub fn last_scan(&self) -> Option<ScanReport> {
        self.scheduler.last_report()
    }

    /// Scan counters since creation.
    #[must_use]
    pub fn scan_counts(&self) -> ScanCountersSnapshot {
        self.scheduler.counters()
    }

    /// Number of listener callbacks that panicked.
    #[must_use]
    pub fn listener_failures(&self) -> u64 {
        self.scheduler.hub().failures()
    }

    /// Block until the index is valid. Returns `false` on timeout or disposal.
    #[must_use]
    pub fn wait_until_valid(&self, timeout: Duration) -> bool {
        self.scheduler.wait_until_valid(timeout)
    }
}

impl std::fmt::Debug for FileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileIndex")
            .field("root", &self.root())
            .field("state", &self.state())
            .field("count", &self.count_or_unknown())
            .finish()
    }
}

/// Compile `pattern`, ignoring case when it has no uppercase characters.
fn smart_case_regex(pattern: &str) -> Result<Regex> {
    let case_insensitive = !pattern.chars().any(char::is_uppercase);
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()?)
}
