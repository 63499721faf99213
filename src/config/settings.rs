//! Configuration settings and validation.

use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default debounce applied to filesystem change notifications.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Longest debounce accepted by `validate`.
const MAX_DEBOUNCE: Duration = Duration::from_secs(60);

/// Main configuration for a workspace index.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace root to index. `None` defers until a root is set.
    pub root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Rescan when files under the root change.
    pub watch: bool,

    /// Debounce applied to change notifications.
    pub debounce: Duration,

    /// Extra gitignore-syntax patterns applied to every scan.
    pub ignore_patterns: Vec<String>,

    /// Ignore files read from the workspace root on every scan.
    pub ignore_files: Vec<String>,

    /// Follow symbolic links while enumerating.
    pub follow_links: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            log_level: "info".to_string(),
            watch: true,
            debounce: DEFAULT_DEBOUNCE,
            ignore_patterns: Vec::new(),
            ignore_files: vec![".gitignore".to_string(), ".ignore".to_string()],
            follow_links: false,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration for the given root with defaults elsewhere.
    #[must_use]
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.debounce.is_zero() {
            return Err(Error::config("debounce cannot be 0"));
        }

        if self.debounce > MAX_DEBOUNCE {
            return Err(Error::config("debounce cannot exceed 60s"));
        }

        if let Some(root) = &self.root {
            if !root.is_dir() {
                return Err(Error::config(format!(
                    "root '{}' is not a directory",
                    root.display()
                )));
            }
        }

        if self.ignore_files.iter().any(String::is_empty) {
            return Err(Error::config("ignore file names cannot be empty"));
        }

        Ok(())
    }
}
