//! Integration tests for `jerry-dash serve` lifecycle flags and the live API.

mod common;

use common::TestEnv;
use predicates::prelude::*;

/// A PID no live process will have.
const DEAD_PID: u32 = 2_147_483_646;

fn write_pid_file(env: &TestEnv, pid: u32, port: u16) {
    std::fs::write(
        env.data_path().join("server.pid"),
        format!("PID={}\nPORT={}\nHOST=127.0.0.1\n", pid, port),
    )
    .unwrap();
}

#[test]
fn test_status_without_pid_file() {
    let env = TestEnv::new();
    env.jerry_dash()
        .args(["serve", "--status"])
        .assert()
        .success()
        .stdout("{\"status\":\"not_running\"}\n");
}

#[test]
fn test_status_human_without_pid_file() {
    let env = TestEnv::new();
    env.jerry_dash()
        .args(["serve", "--status", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not running (no PID file)"));
}

#[test]
fn test_status_reports_dead_process() {
    let env = TestEnv::new();
    write_pid_file(&env, DEAD_PID, 3999);

    env.jerry_dash()
        .args(["serve", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"not_running\""))
        .stdout(predicate::str::contains(&format!("\"pid\":{}", DEAD_PID)))
        .stdout(predicate::str::contains("\"port\":3999"));
}

#[test]
fn test_stop_without_server() {
    let env = TestEnv::new();
    env.jerry_dash()
        .args(["serve", "--stop"])
        .assert()
        .success()
        .stdout("{\"status\":\"not_running\"}\n");
}

#[test]
fn test_stop_cleans_stale_pid_file() {
    let env = TestEnv::new();
    write_pid_file(&env, DEAD_PID, 3999);

    env.jerry_dash()
        .args(["serve", "--stop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"cleaned_stale\":true"));

    assert!(!env.data_path().join("server.pid").exists());
}

#[test]
fn test_missing_static_dir_is_an_error() {
    let env = TestEnv::new();
    env.jerry_dash()
        .args(["serve", "--static-dir"])
        .arg(env.data_path().join("no-such-dir"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Static directory not found"));
}

#[cfg(unix)]
#[test]
fn test_live_server_lifecycle() {
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let env = TestEnv::with_fake_cli();
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut child = env
        .jerry_dash_process()
        .args(["serve", "--port", &port.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let base = format!("http://127.0.0.1:{}", port);
    let deadline = Instant::now() + Duration::from_secs(15);
    let body = loop {
        match ureq::get(&format!("{}/api/sessions", base)).call() {
            Ok(response) => break response.into_string().unwrap(),
            Err(_) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(100)),
            Err(e) => {
                child.kill().ok();
                panic!("server never came up: {}", e);
            }
        }
    };

    let sessions: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(sessions["sessions"].as_array().unwrap().len(), 3);

    let jobs: serde_json::Value = ureq::get(&format!("{}/api/cron/list", base))
        .call()
        .unwrap()
        .into_json()
        .unwrap();
    assert_eq!(jobs["jobs"][0]["id"], "daily");

    env.jerry_dash()
        .args(["serve", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"running\""))
        .stdout(predicate::str::contains(&format!("\"port\":{}", port)));

    env.jerry_dash()
        .args(["serve"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already running"));

    env.jerry_dash()
        .args(["serve", "--stop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"stopped\""));

    let status = child.wait().unwrap();
    assert!(status.success());
    assert!(!env.data_path().join("server.pid").exists());
}
