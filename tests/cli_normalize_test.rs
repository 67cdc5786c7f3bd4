//! Integration tests for `jerry-dash normalize`.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_strips_decoration_before_payload() {
    let env = TestEnv::new();
    env.jerry_dash()
        .arg("normalize")
        .write_stdin("◇ Fetching jobs\n│\n{\"jobs\":[{\"id\":\"a\"}]}\n")
        .assert()
        .success()
        .stdout("{\"jobs\":[{\"id\":\"a\"}]}\n");
}

#[test]
fn test_garbage_prints_default_fallback() {
    let env = TestEnv::new();
    env.jerry_dash()
        .arg("normalize")
        .write_stdin("gateway unreachable\n")
        .assert()
        .success()
        .stdout("null\n");
}

#[test]
fn test_custom_fallback() {
    let env = TestEnv::new();
    env.jerry_dash()
        .args(["normalize", "--fallback", r#"{"sessions":[]}"#])
        .write_stdin("")
        .assert()
        .success()
        .stdout("{\"sessions\":[]}\n");
}

#[test]
fn test_trailing_garbage_falls_back() {
    let env = TestEnv::new();
    env.jerry_dash()
        .args(["normalize", "--fallback", "{}"])
        .write_stdin("{\"ok\":true} and then some\n")
        .assert()
        .success()
        .stdout("{}\n");
}

#[test]
fn test_invalid_fallback_is_an_error() {
    let env = TestEnv::new();
    env.jerry_dash()
        .args(["normalize", "--fallback", "{nope"])
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("--fallback is not valid JSON"));
}

#[test]
fn test_human_output_is_pretty() {
    let env = TestEnv::new();
    env.jerry_dash()
        .args(["normalize", "-H"])
        .write_stdin("{\"a\":1}")
        .assert()
        .success()
        .stdout("{\n  \"a\": 1\n}\n");
}
