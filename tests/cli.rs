//! Tests of the `wsindex` binary.

mod common;

use std::process::Command;

use common::write_tree;
use tempfile::TempDir;

fn wsindex() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wsindex"));
    for var in [
        "RUST_LOG",
        "WSINDEX_ROOT",
        "WSINDEX_WATCH",
        "WSINDEX_IGNORE",
        "WSINDEX_LOG_LEVEL",
        "WSINDEX_LOG_JSON",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// JSON logs go to stderr, leaving stdout a single parseable report.
#[test]
fn test_json_report_is_not_mixed_with_json_logs() {
    let tmp = TempDir::new().unwrap();
    write_tree(tmp.path(), &["b.txt", "A.txt"]);

    let output = wsindex()
        .arg(tmp.path())
        .args(["--json", "--log-json", "--log-level", "debug"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["matches"], serde_json::json!(["A.txt", "b.txt"]));
    assert_eq!(report["scan"]["files"], 2);
    assert!(!output.stderr.is_empty());
}

/// Logging options fall back to the environment.
#[test]
fn test_log_options_from_environment() {
    let tmp = TempDir::new().unwrap();
    write_tree(tmp.path(), &["a.txt"]);

    let output = wsindex()
        .arg(tmp.path())
        .arg("--json")
        .env("WSINDEX_LOG_LEVEL", "debug")
        .env("WSINDEX_LOG_JSON", "true")
        .output()
        .unwrap();
    assert!(output.status.success());

    serde_json::from_slice::<serde_json::Value>(&output.stdout).unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    let first = stderr.lines().next().unwrap();
    serde_json::from_str::<serde_json::Value>(first).unwrap();
}

/// A pattern filters the plain listing.
#[test]
fn test_pattern_filters_listing() {
    let tmp = TempDir::new().unwrap();
    write_tree(tmp.path(), &["src/lib.rs", "README.md"]);

    let output = wsindex()
        .arg(tmp.path())
        .args(["--pattern", "readme"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "README.md\n");
}
