//! Workspace file index.
//!
//! Maintains an eventually-consistent, searchable list of the files under a
//! project directory, rescanned in the background on request or when the
//! filesystem reports a change.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod index;
pub mod observability;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
pub use index::{FileIndex, FileListListener, IndexState, ListenerId, Snapshot, UNKNOWN_COUNT};
