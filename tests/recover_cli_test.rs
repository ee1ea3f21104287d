//! Tests for the `query-tracker-recover` binary.

use std::path::Path;
use std::process::{Command, Output};

use query_tracker::infra::activity_log::{ActivityLog, MappedActivityLog, RecoveredEntry};
use tempfile::tempdir;

fn recover(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_query-tracker-recover"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn seed_log(path: &Path) {
    let log = MappedActivityLog::open(path, 4).unwrap();
    log.insert(&"tenant=team-a query=rate(x[5m])");
    let finished = log.insert(&"query=finished").unwrap();
    log.insert(&"traceID=abc query=sum(\\n  up\\n)");
    log.clear(finished);
    log.close().unwrap();
}

#[test]
fn test_text_output_one_line_per_entry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("active.log");
    seed_log(&path);

    let out = recover(&[path.to_str().unwrap()]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let rows: Vec<Vec<&str>> = stdout.lines().map(|l| l.split('\t').collect()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "0");
    assert!(rows[0][1].parse::<u64>().unwrap() > 0);
    assert_eq!(rows[0][2], "tenant=team-a query=rate(x[5m])");
    assert_eq!(rows[1][0], "2");
    assert_eq!(rows[1][2], "traceID=abc query=sum(\\n  up\\n)");
}

#[test]
fn test_json_output() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("active.log");
    seed_log(&path);

    let out = recover(&[path.to_str().unwrap(), "--json"]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let entries: Vec<RecoveredEntry> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let found: Vec<(usize, &str)> = entries
        .iter()
        .map(|e| (e.slot, e.description.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![
            (0, "tenant=team-a query=rate(x[5m])"),
            (2, "traceID=abc query=sum(\\n  up\\n)"),
        ]
    );
}

#[test]
fn test_empty_log_prints_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("active.log");
    MappedActivityLog::open(&path, 4).unwrap().close().unwrap();

    let out = recover(&[path.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no unfinished operations"));
}

#[test]
fn test_missing_file_and_bad_args_fail() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.log");

    let out = recover(&[missing.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not found"));

    assert!(!recover(&[]).status.success());
    assert!(!recover(&["--bogus"]).status.success());
    assert!(recover(&["--help"]).status.success());
}
