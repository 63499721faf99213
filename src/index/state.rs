//! Index validity and scan bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Validity of the installed file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    /// No root has been scanned yet.
    Uninitialized,
    /// A scan is queued or running; queries report "unknown".
    Scanning,
    /// The installed snapshot reflects a completed scan.
    Valid,
}

impl IndexState {
    /// Whether queries may be answered from the snapshot.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

/// Scan counters shared between triggers and the worker.
#[derive(Debug, Default)]
pub struct ScanCounters {
    pub requested: AtomicU64,
    pub coalesced: AtomicU64,
    pub started: AtomicU64,
    pub completed: AtomicU64,
    pub discarded: AtomicU64,
}

impl ScanCounters {
    /// Get a snapshot of current counters.
    #[must_use]
    pub fn snapshot(&self) -> ScanCountersSnapshot {
        ScanCountersSnapshot {
            requested: self.requested.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of scan counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanCountersSnapshot {
    /// Triggers received (explicit, touch, root change, ensure).
    pub requested: u64,
    /// Triggers absorbed by an already-pending scan.
    pub coalesced: u64,
    /// Scans that began enumerating.
    pub started: u64,
    /// Scans whose snapshot was installed.
    pub completed: u64,
    /// Scans whose result was dropped because the root changed.
    pub discarded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_validity() {
        assert!(!IndexState::Uninitialized.is_valid());
        assert!(!IndexState::Scanning.is_valid());
        assert!(IndexState::Valid.is_valid());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&IndexState::Uninitialized).unwrap();
        assert_eq!(json, "\"uninitialized\"");
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = ScanCounters::default();
        assert_eq!(counters.snapshot(), ScanCountersSnapshot::default());

        counters.requested.fetch_add(3, Ordering::Relaxed);
        counters.coalesced.fetch_add(1, Ordering::Relaxed);
        counters.started.fetch_add(2, Ordering::Relaxed);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.requested, 3);
        assert_eq!(snapshot.coalesced, 1);
        assert_eq!(snapshot.started, 2);
        assert_eq!(snapshot.completed, 0);
    }
}
