//! Single-worker scan scheduling.
//!
//! Every trigger marks the index stale and enqueues a token on a channel of
//! capacity one. The worker drains that channel one token at a time, so at
//! most one scan runs and at most one more waits behind it; further triggers
//! find the slot full and coalesce into the pending scan.
//!
//! Each root change bumps a generation counter. A scan captures the
//! generation when it starts and installs its snapshot only if the
//! generation is unchanged when it finishes.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};

use super::listeners::ListenerHub;
use super::snapshot::{relative_path, ScanReport, Snapshot};
use super::state::{IndexState, ScanCounters, ScanCountersSnapshot};
use crate::error::ScanError;
use crate::observability::spans;
use crate::watcher::{ChangeWatcher, FileEnumerator, IgnoreRuleProvider, TouchCallback};
use crate::Result;

/// The external pieces a scheduler drives.
pub struct Collaborators {
    /// Rebuilt at the start of every scan.
    pub rules: Arc<dyn IgnoreRuleProvider>,
    pub enumerator: Arc<dyn FileEnumerator>,
    pub watcher: Box<dyn ChangeWatcher>,
}

struct Inner {
    root: Option<PathBuf>,
    generation: u64,
    state: IndexState,
    snapshot: Option<Arc<Snapshot>>,
    last_report: Option<ScanReport>,
    /// `None` once disposed.
    jobs: Option<Sender<()>>,
}

pub(crate) struct Core {
    inner: Mutex<Inner>,
    valid_cv: Condvar,
    hub: ListenerHub,
    counters: ScanCounters,
    rules: Arc<dyn IgnoreRuleProvider>,
    enumerator: Arc<dyn FileEnumerator>,
}

impl Core {
    /// Only triggers that reach the queue are counted as requested.
    fn request_scan(&self, reason: &'static str) {
        let mut inner = self.inner.lock();

        let Some(jobs) = inner.jobs.as_ref() else {
            tracing::debug!(reason, "Index disposed, ignoring scan request");
            return;
        };
        if inner.root.is_none() {
            tracing::debug!(reason, "No workspace root, ignoring scan request");
            return;
        }

        self.counters.requested.fetch_add(1, Ordering::Relaxed);
        match jobs.try_send(()) {
            Ok(()) => tracing::debug!(reason, "Scan queued"),
            Err(TrySendError::Full(())) => {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(reason, "Scan already pending, coalescing");
            }
            Err(TrySendError::Disconnected(())) => {
                tracing::warn!(reason, "Scan worker has stopped");
                return;
            }
        }

        self.invalidate(&mut inner);
    }

    /// Install a new root and queue a scan for it.
    fn set_root(&self, root: PathBuf) {
        {
            let mut inner = self.inner.lock();
            if inner.jobs.is_none() {
                return;
            }
            inner.generation += 1;
            tracing::info!(
                root = %root.display(),
                generation = inner.generation,
                "Workspace root changed"
            );
            inner.root = Some(root);
            inner.last_report = None;
        }
        self.request_scan("root changed");
    }

    /// Caller must hold the lock; the notification is queued under it so
    /// listeners see transitions in the order they happened.
    fn invalidate(&self, inner: &mut Inner) {
        if inner.state != IndexState::Scanning {
            inner.state = IndexState::Scanning;
            inner.snapshot = None;
            self.hub.notify(false);
        }
    }

    fn run_scan(&self) {
        let (root, generation) = {
            let mut inner = self.inner.lock();
            if inner.jobs.is_none() {
                return;
            }
            let Some(root) = inner.root.clone() else {
                return;
            };
            // A scan that finished while this one was pending made the
            // index valid again.
            self.invalidate(&mut inner);
            (root, inner.generation)
        };

        self.counters.started.fetch_add(1, Ordering::Relaxed);
        let _span = spans::scan_span(&root, generation).entered();
        let started = Instant::now();
        tracing::debug!("Scan started");

        let filter = self.rules.load(&root);
        let enumeration = self.enumerator.files_under(&root, filter.as_ref());
        let paths: Vec<String> = enumeration
            .files
            .iter()
            .filter_map(|path| relative_path(&root, path))
            .collect();
        let snapshot = Arc::new(Snapshot::new(root.clone(), generation, paths));
        let elapsed = started.elapsed();

        let mut inner = self.inner.lock();
        if inner.jobs.is_none() || inner.generation != generation {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                current_generation = inner.generation,
                "Discarding scan for superseded root"
            );
            return;
        }

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = elapsed.as_millis() as u64;
        tracing::info!(
            files = snapshot.len(),
            excluded = enumeration.stats.excluded,
            errors = enumeration.stats.errors,
            elapsed_ms,
            "Scan complete"
        );

        inner.last_report = Some(ScanReport {
            root,
            generation,
            files: snapshot.len(),
            excluded: enumeration.stats.excluded,
            errors: enumeration.stats.errors,
            elapsed_ms,
            completed_at: Utc::now(),
        });
        inner.snapshot = Some(snapshot);
        inner.state = IndexState::Valid;
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        self.hub.notify(true);
        drop(inner);

        self.valid_cv.notify_all();
    }

    /// Returns `false` if already disposed.
    fn dispose(&self) -> bool {
        let disposed = self.inner.lock().jobs.take().is_some();
        self.valid_cv.notify_all();
        disposed
    }
}

/// Serializes and coalesces scans of one workspace onto a background worker.
pub struct ScanScheduler {
    core: Arc<Core>,
    watcher: Mutex<Box<dyn ChangeWatcher>>,
}

impl ScanScheduler {
    /// Start the scan worker.
    ///
    /// No scan runs until a root is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn new(collaborators: Collaborators) -> Result<Self> {
        let (jobs_tx, jobs_rx) = bounded(1);

        let core = Arc::new(Core {
            inner: Mutex::new(Inner {
                root: None,
                generation: 0,
                state: IndexState::Uninitialized,
                snapshot: None,
                last_report: None,
                jobs: Some(jobs_tx),
            }),
            valid_cv: Condvar::new(),
            hub: ListenerHub::new(),
            counters: ScanCounters::default(),
            rules: collaborators.rules,
            enumerator: collaborators.enumerator,
        });

        let weak = Arc::downgrade(&core);
        thread::Builder::new()
            .name("wsindex-scan".to_string())
            .spawn(move || worker_loop(&weak, &jobs_rx))
            .map_err(|e| ScanError::SpawnFailed {
                thread: "scan worker".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            core,
            watcher: Mutex::new(collaborators.watcher),
        })
    }

    /// Queue a rescan of the current root.
    pub fn request_scan(&self) {
        self.core.request_scan("requested");
    }

    pub(crate) fn request_scan_for(&self, reason: &'static str) {
        self.core.request_scan(reason);
    }

    /// Switch to `root`: re-target the watcher, then queue a scan.
    ///
    /// The watcher is registered before the scan is queued, so a change made
    /// while the scan walks the tree still produces a touch. Any scan still
    /// running for the previous root finishes but is discarded. A watcher
    /// failure is logged; scans still run on request.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory or cannot be resolved.
    pub fn on_root_changed(&self, root: impl AsRef<Path>) -> Result<()> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.display().to_string()).into());
        }
        let root = root.canonicalize()?;

        let mut watcher = self.watcher.lock();
        if self.is_disposed() {
            return Ok(());
        }

        let weak = Arc::downgrade(&self.core);
        let on_touched: TouchCallback = Arc::new(move |path: &Path| {
            if let Some(core) = weak.upgrade() {
                tracing::trace!(path = %path.display(), "Workspace touched");
                core.request_scan("touched");
            }
        });
        if let Err(e) = watcher.watch(&root, on_touched) {
            tracing::warn!(
                root = %root.display(),
                error = %e,
                "Cannot watch workspace root, rescans will only happen on request"
            );
        }

        self.core.set_root(root);
        Ok(())
    }

    /// Stop watching, stop the worker and flush pending notifications.
    ///
    /// Idempotent. A scan already enumerating runs to completion on the
    /// worker and its result is discarded.
    pub fn dispose(&self) {
        let mut watcher = self.watcher.lock();
        if !self.core.dispose() {
            return;
        }
        watcher.dispose();
        drop(watcher);
        self.core.hub.shutdown();
        tracing::debug!("Scan scheduler disposed");
    }

    pub(crate) fn view(&self) -> (IndexState, Option<Arc<Snapshot>>) {
        let inner = self.core.inner.lock();
        (inner.state, inner.snapshot.clone())
    }

    pub(crate) fn root(&self) -> Option<PathBuf> {
        self.core.inner.lock().root.clone()
    }

    pub(crate) fn last_report(&self) -> Option<ScanReport> {
        self.core.inner.lock().last_report.clone()
    }

    pub(crate) fn counters(&self) -> ScanCountersSnapshot {
        self.core.counters.snapshot()
    }

    pub(crate) fn hub(&self) -> &ListenerHub {
        &self.core.hub
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.core.inner.lock().jobs.is_none()
    }

    /// Block until the index is valid, the timeout elapses or it is disposed.
    #[must_use]
    pub fn wait_until_valid(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.core.inner.lock();
        while !inner.state.is_valid() {
            if inner.jobs.is_none() {
                return false;
            }
            if self.core.valid_cv.wait_until(&mut inner, deadline).timed_out() {
                return inner.state.is_valid();
            }
        }
        true
    }
}

impl Drop for ScanScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn worker_loop(core: &Weak<Core>, jobs: &Receiver<()>) {
    while jobs.recv().is_ok() {
        let Some(core) = core.upgrade() else {
            break;
        };
        core.run_scan();
    }
    tracing::debug!("Scan worker shutting down");
}
