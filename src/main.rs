//! wsindex - workspace file index
//!
//! Scans a directory, prints the indexed files, and optionally keeps the
//! index current while the tree changes.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use workspace_index::index::ScanReport;
use workspace_index::observability::{config_from_env, init_tracing};
use workspace_index::{Config, FileIndex};

/// Index a workspace and list or search its files
#[derive(Parser, Debug)]
#[command(name = "wsindex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workspace root to index
    #[arg(env = "WSINDEX_ROOT", default_value = ".")]
    root: PathBuf,

    /// Only print paths matching this regular expression (smart case)
    #[arg(short, long)]
    pattern: Option<String>,

    /// Keep running and rescan when files change
    #[arg(short, long, env = "WSINDEX_WATCH")]
    watch: bool,

    /// Extra gitignore-style patterns to exclude
    #[arg(short, long, env = "WSINDEX_IGNORE", value_delimiter = ',')]
    ignore: Vec<String>,

    /// Debounce for change notifications, in milliseconds
    #[arg(long, env = "WSINDEX_DEBOUNCE_MS", default_value = "500")]
    debounce_ms: u64,

    /// Follow symbolic links while scanning
    #[arg(long)]
    follow_links: bool,

    /// Give up waiting for the first scan after this many seconds
    #[arg(long, default_value = "300")]
    timeout_secs: u64,

    /// Print a JSON report instead of one path per line
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error) [env: WSINDEX_LOG_LEVEL, default: warn]
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging output [env: WSINDEX_LOG_JSON]
    #[arg(long)]
    log_json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    scan: Option<ScanReport>,
    pattern: Option<&'a str>,
    matches: &'a [String],
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut tracing_config = config_from_env();
    if let Some(level) = &cli.log_level {
        tracing_config.level.clone_from(level);
    }
    tracing_config.json |= cli.log_json;
    init_tracing(&tracing_config);

    let config = Config {
        root: Some(cli.root.clone()),
        log_level: tracing_config.level.clone(),
        watch: cli.watch,
        debounce: Duration::from_millis(cli.debounce_ms),
        ignore_patterns: cli.ignore.clone(),
        follow_links: cli.follow_links,
        ..Config::default()
    };

    tracing::debug!(?config, "Configuration loaded");

    let index = FileIndex::new(&config)
        .with_context(|| format!("failed to index {}", cli.root.display()))?;

    let timeout = Duration::from_secs(cli.timeout_secs);
    let ready = {
        let index = &index;
        tokio::task::block_in_place(|| index.wait_until_valid(timeout))
    };
    if !ready {
        bail!("scan of {} did not finish within {:?}", cli.root.display(), timeout);
    }

    print_matches(&index, &cli)?;

    if cli.watch {
        index
            .subscribe(|valid: bool| {
                if !valid {
                    tracing::info!("Workspace changed, rescanning");
                }
            })
            .context("failed to subscribe to index changes")?;
        tracing::info!("Watching for changes, press Ctrl-C to stop");

        let mut last_completed = index.last_scan().map(|r| r.completed_at);
        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = ticker.tick() => {
                    let Some(report) = index.last_scan().filter(|_| index.is_valid()) else {
                        continue;
                    };
                    if last_completed != Some(report.completed_at) {
                        tracing::info!(files = report.files, elapsed_ms = report.elapsed_ms, "Index updated");
                        print_matches(&index, &cli)?;
                        last_completed = Some(report.completed_at);
                    }
                }
            }
        }
    }

    index.dispose();
    Ok(())
}

fn print_matches(index: &FileIndex, cli: &Cli) -> anyhow::Result<()> {
    let matches = match cli.pattern.as_deref() {
        Some(pattern) => index
            .search_regex(pattern)
            .with_context(|| format!("bad pattern '{pattern}'"))?,
        None => index.search(|_| true),
    };

    if cli.json {
        let report = Report {
            scan: index.last_scan(),
            pattern: cli.pattern.as_deref(),
            matches: &matches,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for path in &matches {
            println!("{path}");
        }
    }
    Ok(())
}
