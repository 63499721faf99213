//! Structured logging configuration.
//!
//! Sets up the `tracing` subscriber with:
//! - Plain text or JSON output
//! - Log level from the environment or configuration
//! - Spans that tag every scan with its root and generation

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Level used when neither the command line nor the environment sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Tracing configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable JSON output format
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

/// Initialize tracing with the given level and output format.
///
/// Both formats write to stderr so stdout carries only command output.
/// `RUST_LOG`, when set, overrides the configured level.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed in this process.
pub fn init_tracing(config: &TracingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr);

        Registry::default().with(env_filter).with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_writer(std::io::stderr);

        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    tracing::debug!(
        "Tracing initialized: level={}, json={}",
        config.level,
        config.json
    );
}

/// Get current tracing configuration from environment variables.
///
/// Respects these environment variables:
/// - `WSINDEX_LOG_LEVEL` - Log level (default: "warn")
/// - `WSINDEX_LOG_JSON` - Enable JSON output (default: false)
#[must_use]
pub fn config_from_env() -> TracingConfig {
    config_from_vars(
        std::env::var("WSINDEX_LOG_LEVEL").ok(),
        std::env::var("WSINDEX_LOG_JSON").ok(),
    )
}

fn config_from_vars(level: Option<String>, json: Option<String>) -> TracingConfig {
    let defaults = TracingConfig::default();
    TracingConfig {
        level: level
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.level),
        json: json.map_or(defaults.json, |v| {
            matches!(v.to_lowercase().as_str(), "true" | "1" | "yes")
        }),
    }
}

/// Span helpers shared by the scan worker and delivery threads.
pub mod spans {
    use std::path::Path;
    use tracing::{info_span, Span};

    /// Create a span covering one scan of `root`.
    #[must_use]
    pub fn scan_span(root: &Path, generation: u64) -> Span {
        info_span!(
            "scan",
            root = %root.display(),
            generation = generation,
        )
    }

    /// Create a span for one listener notification.
    #[must_use]
    pub fn notify_span(valid: bool) -> Span {
        info_span!("notify", valid = valid)
    }
}
