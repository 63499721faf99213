//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use workspace_index::index::Collaborators;
use workspace_index::watcher::{
    ChangeWatcher, Enumeration, FileEnumerator, GitignoreRules, IgnoreRuleProvider, NullWatcher,
    PathFilter, TouchCallback, WalkEnumerator,
};
use workspace_index::FileIndex;

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Create `files` (relative, `/`-separated) under `root`.
pub fn write_tree(root: &Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, file.as_bytes()).unwrap();
    }
}

/// Poll `condition` until it holds or `TIMEOUT` elapses.
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Enumerator that announces each scan and blocks until released.
pub struct GatedEnumerator {
    inner: WalkEnumerator,
    entered_tx: Sender<PathBuf>,
    release_rx: Receiver<()>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub calls: AtomicUsize,
}

/// Test-side handles for a `GatedEnumerator`.
pub struct Gate {
    pub entered: Receiver<PathBuf>,
    release: Sender<()>,
}

impl Gate {
    /// Wait for the next scan to begin enumerating; returns its root.
    pub fn next_scan(&self) -> PathBuf {
        self.entered
            .recv_timeout(TIMEOUT)
            .expect("scan did not start")
    }

    /// Let one blocked scan proceed.
    pub fn release(&self) {
        self.release.send(()).unwrap();
    }
}

impl GatedEnumerator {
    pub fn new() -> (Arc<Self>, Gate) {
        let (entered_tx, entered) = unbounded();
        let (release, release_rx) = unbounded();
        let enumerator = Arc::new(Self {
            inner: WalkEnumerator::default(),
            entered_tx,
            release_rx,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        });
        (enumerator, Gate { entered, release })
    }
}

impl FileEnumerator for GatedEnumerator {
    fn files_under(&self, root: &Path, filter: &dyn PathFilter) -> Enumeration {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let _ = self.entered_tx.send(root.to_path_buf());
        let _ = self.release_rx.recv_timeout(TIMEOUT);
        let result = self.inner.files_under(root, filter);

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[derive(Default)]
struct ManualState {
    callback: Option<TouchCallback>,
    roots: Vec<PathBuf>,
    disposed: usize,
}

/// Watcher whose touches are fired by the test.
#[derive(Clone, Default)]
pub struct ManualWatcher {
    state: Arc<Mutex<ManualState>>,
}

impl ManualWatcher {
    pub fn touch(&self, path: &Path) {
        let callback = self.state.lock().callback.clone();
        if let Some(callback) = callback {
            callback(path);
        }
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.state.lock().roots.clone()
    }

    pub fn is_watching(&self) -> bool {
        self.state.lock().callback.is_some()
    }

    pub fn disposed(&self) -> usize {
        self.state.lock().disposed
    }
}

impl ChangeWatcher for ManualWatcher {
    fn watch(&mut self, root: &Path, on_touched: TouchCallback) -> workspace_index::Result<()> {
        let mut state = self.state.lock();
        state.callback = Some(on_touched);
        state.roots.push(root.to_path_buf());
        Ok(())
    }

    fn dispose(&mut self) {
        let mut state = self.state.lock();
        state.callback = None;
        state.disposed += 1;
    }
}

pub fn rules(patterns: &[&str]) -> Arc<dyn IgnoreRuleProvider> {
    Arc::new(GitignoreRules::new(
        vec![".gitignore".to_string()],
        patterns.iter().map(ToString::to_string).collect(),
    ))
}

/// Index over a gated enumerator and a manual watcher.
pub fn gated_index() -> (FileIndex, Gate, Arc<GatedEnumerator>, ManualWatcher) {
    let (enumerator, gate) = GatedEnumerator::new();
    let watcher = ManualWatcher::default();
    let index = FileIndex::with_collaborators(Collaborators {
        rules: rules(&[]),
        enumerator: Arc::clone(&enumerator) as Arc<dyn FileEnumerator>,
        watcher: Box::new(watcher.clone()),
    })
    .unwrap();
    (index, gate, enumerator, watcher)
}

/// Index over the real enumerator with no change watching.
pub fn plain_index(patterns: &[&str]) -> FileIndex {
    FileIndex::with_collaborators(Collaborators {
        rules: rules(patterns),
        enumerator: Arc::new(WalkEnumerator::default()),
        watcher: Box::new(NullWatcher),
    })
    .unwrap()
}

/// Recording listener callback and its log.
pub fn recorder() -> (impl Fn(bool) + Send + Sync + 'static, Arc<Mutex<Vec<bool>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (move |valid: bool| sink.lock().push(valid), seen)
}
