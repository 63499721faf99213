//! Error types and Result aliases for the workspace index.
//!
//! Query operations on the index never fail; errors only surface from
//! construction, configuration and pattern compilation.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for workspace index operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Scan scheduling error.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Invalid search pattern.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// I/O error, such as a root that cannot be resolved.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// Watcher backend could not be created.
    #[error("failed to initialize watcher: {0}")]
    Init(String),
}

/// Scan worker errors.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A background thread could not be started.
    #[error("failed to spawn {thread} thread: {reason}")]
    SpawnFailed { thread: String, reason: String },

    /// The root is not a readable directory.
    #[error("not a directory: '{0}'")]
    NotADirectory(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests;
