//! Common test utilities for jerry-dash integration tests.
//!
//! Provides `TestEnv` for isolated environments that never touch the
//! user's `~/.openclaw` or dashboard data directory.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Sessions printed by the fake CLI, behind a line of progress decoration.
pub const SESSIONS_OUTPUT: &str = r#"◇ Loading sessions
{"sessions":[
  {"key":"agent:jerry:main","sessionId":"s-main","model":"claude-sonnet","totalTokens":1200},
  {"key":"agent:jerry:cron:daily","sessionId":"s-cron","model":"claude-haiku","totalTokens":300},
  {"key":"agent:scout:subagent:7","model":"claude-haiku","totalTokens":45}
]}"#;

pub const JOBS_OUTPUT: &str =
    r#"{"jobs":[{"id":"daily","name":"Daily digest","enabled":true},{"id":"weekly","name":"Weekly","enabled":false}]}"#;

/// A test environment with its own platform home and data directory.
///
/// - `platform_dir`: stands in for `~/.openclaw`
/// - `data_dir`: history snapshots and the server PID file
/// - `bin_dir`: holds the fake `openclaw` script written by [`TestEnv::with_fake_cli`]
pub struct TestEnv {
    pub platform_dir: TempDir,
    pub data_dir: TempDir,
    pub bin_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            platform_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
            bin_dir: TempDir::new().unwrap(),
        }
    }

    /// Environment whose CLI answers `sessions list` and `cron list` with
    /// canned output and fails everything else.
    #[cfg(unix)]
    pub fn with_fake_cli() -> Self {
        use std::os::unix::fs::PermissionsExt;

        let env = Self::new();
        let script = format!(
            "#!/bin/sh\ncase \"$1 $2\" in\n  \"sessions list\") cat <<'OUT'\n{}\nOUT\n  ;;\n  \"cron list\") cat <<'OUT'\n{}\nOUT\n  ;;\n  *) echo \"unknown command\" >&2; exit 1 ;;\nesac\n",
            SESSIONS_OUTPUT, JOBS_OUTPUT
        );
        let path = env.cli_path();
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        env
    }

    pub fn cli_path(&self) -> PathBuf {
        self.bin_dir.path().join("openclaw")
    }

    /// Command for the jerry-dash binary wired to this environment.
    ///
    /// No billing key is configured, so nothing reaches the network.
    pub fn jerry_dash(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_jerry-dash"));
        self.apply_env(&mut cmd);
        cmd
    }

    /// Same wiring for a long-running `std::process::Command`.
    pub fn jerry_dash_process(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_jerry-dash"));
        cmd.env("JERRY_PLATFORM_HOME", self.platform_dir.path())
            .env("JERRY_DASH_DATA_DIR", self.data_dir.path())
            .env("JERRY_CLI_BIN", self.cli_path())
            .env("JERRY_BILLING_URL", "http://127.0.0.1:9")
            .env_remove("OPENROUTER_API_KEY")
            .env_remove("RUST_LOG");
        cmd
    }

    fn apply_env(&self, cmd: &mut Command) {
        cmd.env("JERRY_PLATFORM_HOME", self.platform_dir.path())
            .env("JERRY_DASH_DATA_DIR", self.data_dir.path())
            .env("JERRY_CLI_BIN", self.cli_path())
            .env("JERRY_BILLING_URL", "http://127.0.0.1:9")
            .env_remove("OPENROUTER_API_KEY")
            .env_remove("RUST_LOG");
    }

    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    pub fn history_dir(&self) -> PathBuf {
        self.data_dir.path().join("history")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
