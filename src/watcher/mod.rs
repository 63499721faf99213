//! Filesystem collaborators of the index.
//!
//! This module provides:
//! - Gitignore-aware exclusion rules, reloaded per scan
//! - Directory enumeration using walkdir
//! - Change watching using notify-rs

mod filter;
mod scanner;
#[allow(clippy::module_inception)]
mod watcher;

pub use filter::{GitignoreRules, IgnoreRuleProvider, IgnoreRules, PathFilter};
pub use scanner::{Enumeration, FileEnumerator, WalkEnumerator, WalkStats};
pub use watcher::{ChangeWatcher, NotifyWatcher, NullWatcher, TouchCallback};
