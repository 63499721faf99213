//! Validity-change notifications.
//!
//! Every subscriber owns an ordered queue drained by its own delivery
//! thread. A subscriber sees notifications in exactly the order they were
//! produced, callbacks never run on the scan worker or the caller of a
//! trigger, and a callback that blocks only holds up its own queue.

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::ScanError;
use crate::observability::spans;
use crate::Result;

thread_local! {
    static ON_DELIVERY_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Receives file list validity changes.
///
/// Calls do not necessarily imply a change of state since the previous one.
/// Each listener has its own delivery thread; a slow callback only delays
/// later notifications to the same listener.
pub trait FileListListener: Send + Sync {
    /// Invoked with `true` once a scan has been installed, `false` when the
    /// current list becomes stale.
    fn file_list_state_changed(&self, is_valid: bool);
}

impl<F> FileListListener for F
where
    F: Fn(bool) + Send + Sync,
{
    fn file_list_state_changed(&self, is_valid: bool) {
        self(is_valid);
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

enum Delivery {
    Notify(bool),
    Flush(Sender<()>),
}

struct Subscriber {
    id: ListenerId,
    tx: Sender<Delivery>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    subscribers: Vec<Subscriber>,
    closed: bool,
}

/// Subscription registry with one delivery queue per listener.
#[derive(Default)]
pub struct ListenerHub {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
    failures: Arc<AtomicU64>,
}

impl fmt::Debug for ListenerHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHub")
            .field("listeners", &self.len())
            .field("failures", &self.failures())
            .finish_non_exhaustive()
    }
}

impl ListenerHub {
    /// Create an empty hub. Threads are started per subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for all subsequent notifications.
    ///
    /// After `shutdown` the listener is accepted but never called.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's delivery thread cannot be spawned.
    pub fn subscribe(&self, listener: Arc<dyn FileListListener>) -> Result<ListenerId> {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = unbounded();
        let failures = Arc::clone(&self.failures);
        let handle = thread::Builder::new()
            .name(format!("wsindex-notify-{}", id.0))
            .spawn(move || delivery_loop(id, &rx, listener.as_ref(), &failures))
            .map_err(|e| ScanError::SpawnFailed {
                thread: "listener delivery".to_string(),
                reason: e.to_string(),
            })?;

        let mut registry = self.registry.lock();
        if registry.closed {
            tracing::debug!(listener = id.0, "Listener hub shut down, listener ignored");
        } else {
            registry.subscribers.push(Subscriber { id, tx, handle });
            tracing::debug!(listener = id.0, "Listener subscribed");
        }
        Ok(id)
    }

    /// Remove a listener. Returns `false` if it was not registered.
    ///
    /// Notifications already queued for it are still delivered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut registry = self.registry.lock();
        let Some(pos) = registry.subscribers.iter().position(|s| s.id == id) else {
            return false;
        };
        // Dropping the sender lets its thread drain the queue and exit.
        drop(registry.subscribers.remove(pos));
        tracing::debug!(listener = id.0, "Listener unsubscribed");
        true
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of listener callbacks that panicked.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Queue a validity notification for every listener. Never blocks.
    pub fn notify(&self, valid: bool) {
        let registry = self.registry.lock();
        for subscriber in &registry.subscribers {
            if subscriber.tx.send(Delivery::Notify(valid)).is_err() {
                tracing::warn!(listener = subscriber.id.0, "Listener delivery thread has stopped");
            }
        }
    }

    /// Block until every notification queued before this call was delivered.
    ///
    /// Returns immediately when called from a listener callback or after
    /// shutdown.
    pub fn flush(&self) {
        if ON_DELIVERY_THREAD.with(Cell::get) {
            return;
        }
        let acks: Vec<Receiver<()>> = {
            let registry = self.registry.lock();
            registry
                .subscribers
                .iter()
                .filter_map(|subscriber| {
                    let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
                    subscriber.tx.send(Delivery::Flush(ack_tx)).ok()?;
                    Some(ack_rx)
                })
                .collect()
        };
        for ack in acks {
            let _ = ack.recv();
        }
    }

    /// Deliver what is queued, then stop every delivery thread.
    ///
    /// Called from a listener callback it stops the queues without waiting.
    pub fn shutdown(&self) {
        let subscribers = {
            let mut registry = self.registry.lock();
            if registry.closed {
                return;
            }
            registry.closed = true;
            std::mem::take(&mut registry.subscribers)
        };

        let handles: Vec<_> = subscribers
            .into_iter()
            .map(|Subscriber { tx, handle, .. }| {
                drop(tx);
                handle
            })
            .collect();

        if ON_DELIVERY_THREAD.with(Cell::get) {
            return;
        }
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("Listener delivery thread panicked");
            }
        }
    }
}

impl Drop for ListenerHub {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn delivery_loop(
    id: ListenerId,
    rx: &Receiver<Delivery>,
    listener: &dyn FileListListener,
    failures: &AtomicU64,
) {
    ON_DELIVERY_THREAD.with(|flag| flag.set(true));
    for delivery in rx {
        match delivery {
            Delivery::Notify(valid) => {
                let _span = spans::notify_span(valid).entered();
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    listener.file_list_state_changed(valid);
                }));
                if result.is_err() {
                    failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(listener = id.0, valid, "Listener callback panicked");
                }
            }
            Delivery::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!(listener = id.0, "Listener delivery thread shutting down");
}
