//! Integration tests for `jerry-dash snapshot`.

#![cfg(unix)]

mod common;

use common::TestEnv;
use predicates::prelude::*;
use serde_json::Value;

fn snapshot_files(env: &TestEnv) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(env.history_dir())
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

#[test]
fn test_snapshot_writes_daily_file() {
    let env = TestEnv::with_fake_cli();

    let output = env.jerry_dash().arg("snapshot").output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let reported: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reported["sessions"], 3);
    assert_eq!(reported["totalTokens"], 1545);
    assert_eq!(reported["updates"], 0);

    let files = snapshot_files(&env);
    assert_eq!(files.len(), 1);
    assert_eq!(reported["path"], files[0].display().to_string());

    let snapshot: Value = serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(snapshot["date"], reported["date"]);
    assert_eq!(snapshot["sessions"]["main"], 1);
    assert_eq!(snapshot["sessions"]["cron"], 1);
    assert_eq!(snapshot["sessions"]["subagent"], 1);
    assert_eq!(snapshot["modelUsage"]["claude-haiku"], 2);
    assert_eq!(snapshot["cronJobs"]["enabled"], 1);
    assert_eq!(snapshot["cronJobs"]["disabled"], 1);
    assert_eq!(snapshot["cost"]["connected"], false);
}

#[test]
fn test_second_snapshot_same_day_counts_update() {
    let env = TestEnv::with_fake_cli();

    env.jerry_dash().arg("snapshot").assert().success();
    let first: Value = serde_json::from_str(
        &std::fs::read_to_string(&snapshot_files(&env)[0]).unwrap(),
    )
    .unwrap();

    env.jerry_dash()
        .arg("snapshot")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"updates\":1"));

    let files = snapshot_files(&env);
    assert_eq!(files.len(), 1);
    let second: Value = serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(second["updates"], 1);
    assert_eq!(second["firstTimestamp"], first["timestamp"]);
}

#[test]
fn test_snapshot_with_failing_cli_records_zeroes() {
    // No fake CLI written: every call fails and falls back to empty lists.
    let env = TestEnv::new();

    env.jerry_dash()
        .args(["snapshot", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved snapshot for"))
        .stdout(predicate::str::contains("Sessions: 0"));

    assert_eq!(snapshot_files(&env).len(), 1);
}
