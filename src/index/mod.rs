//! The workspace file index.
//!
//! This module provides:
//! - A single-worker scheduler that serializes and coalesces rescans
//! - Immutable, case-insensitively sorted snapshots swapped in whole
//! - Ordered validity notifications, one delivery queue per listener

mod file_index;
mod listeners;
mod scheduler;
mod snapshot;
mod state;

pub use file_index::{FileIndex, UNKNOWN_COUNT};
pub use listeners::{FileListListener, ListenerHub, ListenerId};
pub use scheduler::{Collaborators, ScanScheduler};
pub use snapshot::{compare_case_insensitive, relative_path, ScanReport, Snapshot};
pub use state::{IndexState, ScanCounters, ScanCountersSnapshot};
