//! File system change watching using notify-rs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};

use crate::config::DEFAULT_DEBOUNCE;
use crate::error::WatcherError;
use crate::Result;

/// Callback invoked with the path of every touched file or directory.
pub type TouchCallback = Arc<dyn Fn(&Path) + Send + Sync>;

/// Observes a root and reports touched paths asynchronously.
///
/// Delivery is at-least-once per change; callers must not rely on ordering.
pub trait ChangeWatcher: Send {
    /// Start watching `root`, replacing any previous registration.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be watched.
    fn watch(&mut self, root: &Path, on_touched: TouchCallback) -> Result<()>;

    /// Stop watching and release the backend.
    fn dispose(&mut self);
}

/// Watcher that never reports anything.
#[derive(Debug, Default)]
pub struct NullWatcher;

impl ChangeWatcher for NullWatcher {
    fn watch(&mut self, root: &Path, _on_touched: TouchCallback) -> Result<()> {
        tracing::debug!(root = %root.display(), "Change watching disabled");
        Ok(())
    }

    fn dispose(&mut self) {}
}

/// Debounced recursive watcher backed by the platform's notify backend.
pub struct NotifyWatcher {
    debounce: Duration,
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    root: Option<PathBuf>,
}

impl fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("debounce", &self.debounce)
            .field("root", &self.root)
            .field("active", &self.debouncer.is_some())
            .finish()
    }
}

impl Default for NotifyWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl NotifyWatcher {
    /// Create a watcher that coalesces events arriving within `debounce`.
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            debouncer: None,
            root: None,
        }
    }

    /// The root currently being watched, if any.
    #[must_use]
    pub fn watched_root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl ChangeWatcher for NotifyWatcher {
    fn watch(&mut self, root: &Path, on_touched: TouchCallback) -> Result<()> {
        self.dispose();

        if !root.exists() {
            return Err(WatcherError::WatchFailed {
                path: root.display().to_string(),
                reason: "directory does not exist".to_string(),
            }
            .into());
        }

        let mut debouncer = new_debouncer(
            self.debounce,
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    for event in events {
                        on_touched(&event.path);
                    }
                }
                Err(e) => {
                    tracing::error!("Watch error: {:?}", e);
                }
            },
        )
        .map_err(|e| WatcherError::Init(e.to_string()))?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatcherError::WatchFailed {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(path = %root.display(), "Watching directory");
        self.debouncer = Some(debouncer);
        self.root = Some(root.to_path_buf());
        Ok(())
    }

    fn dispose(&mut self) {
        if self.debouncer.take().is_some() {
            if let Some(root) = self.root.take() {
                tracing::info!(path = %root.display(), "Stopped watching directory");
            }
        }
    }
}

impl Drop for NotifyWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tempfile::TempDir;

    fn counting_callback() -> (TouchCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let callback: TouchCallback = Arc::new(move |_: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (callback, count)
    }

    #[test]
    fn test_default_debounce() {
        let watcher = NotifyWatcher::default();
        assert_eq!(watcher.debounce, DEFAULT_DEBOUNCE);
        assert!(watcher.watched_root().is_none());
    }

    #[test]
    fn test_watch_nonexistent_dir() {
        let mut watcher = NotifyWatcher::default();
        let (callback, _) = counting_callback();

        let result = watcher.watch(Path::new("/nonexistent/directory"), callback);
        assert!(result.is_err());
        assert!(watcher.watched_root().is_none());
    }

    #[test]
    fn test_watch_replaces_and_disposes() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let mut watcher = NotifyWatcher::new(Duration::from_millis(50));

        let (callback, _) = counting_callback();
        watcher.watch(first.path(), Arc::clone(&callback)).unwrap();
        assert_eq!(watcher.watched_root(), Some(first.path()));

        watcher.watch(second.path(), callback).unwrap();
        assert_eq!(watcher.watched_root(), Some(second.path()));

        watcher.dispose();
        assert!(watcher.watched_root().is_none());
    }

    #[test]
    fn test_touch_is_reported() {
        let tmp = TempDir::new().unwrap();
        let mut watcher = NotifyWatcher::new(Duration::from_millis(50));
        let (callback, count) = counting_callback();
        watcher.watch(tmp.path(), callback).unwrap();

        std::fs::write(tmp.path().join("new.txt"), "hello").unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while count.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(count.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_null_watcher() {
        let tmp = TempDir::new().unwrap();
        let mut watcher = NullWatcher;
        let (callback, count) = counting_callback();

        watcher.watch(tmp.path(), callback).unwrap();
        std::fs::write(tmp.path().join("a.txt"), "").unwrap();
        watcher.dispose();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
