//! The OpenClaw CLI as a narrow capability interface.
//!
//! Every operation maps to one fixed argument vector and one timeout
//! class, runs through a [`CommandRunner`], and returns the raw stdout
//! (or `None` when the call failed). Parsing is left to the
//! normalization layer so these calls can be swapped for canned text in
//! tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DashboardConfig, Timeouts};
use crate::runner::{CommandRunner, Invocation};

/// Raw access to the OpenClaw CLI.
#[derive(Clone)]
pub struct OpenClaw {
    runner: Arc<dyn CommandRunner>,
    program: PathBuf,
    timeouts: Timeouts,
}

impl OpenClaw {
    pub fn new(runner: Arc<dyn CommandRunner>, program: PathBuf, timeouts: Timeouts) -> Self {
        Self {
            runner,
            program,
            timeouts,
        }
    }

    pub fn from_config(runner: Arc<dyn CommandRunner>, config: &DashboardConfig) -> Self {
        Self::new(runner, config.cli_bin.clone(), config.timeouts.clone())
    }

    fn call(&self, args: &[&str], timeout: Duration) -> Option<String> {
        self.call_owned(args.iter().map(|s| s.to_string()).collect(), timeout)
    }

    fn call_owned(&self, args: Vec<String>, timeout: Duration) -> Option<String> {
        let invocation = Invocation {
            program: self.program.clone(),
            args,
            timeout,
        };
        self.runner.run(&invocation)
    }

    pub fn list_sessions(&self) -> Option<String> {
        self.call(&["sessions", "list", "--json"], self.timeouts.list)
    }

    pub fn list_jobs(&self) -> Option<String> {
        self.call(&["cron", "list", "--json"], self.timeouts.list)
    }

    pub fn cron_status(&self) -> Option<String> {
        self.call(&["cron", "status", "--json"], self.timeouts.list)
    }

    pub fn cron_runs(&self, job_id: &str, limit: u32) -> Option<String> {
        self.call_owned(
            vec![
                "cron".to_string(),
                "runs".to_string(),
                "--id".to_string(),
                job_id.to_string(),
                "--limit".to_string(),
                limit.to_string(),
                "--json".to_string(),
            ],
            self.timeouts.list,
        )
    }

    /// Trigger one job run now.
    pub fn run_job(&self, job_id: &str) -> Option<String> {
        self.call_owned(
            vec!["cron".to_string(), "run".to_string(), job_id.to_string()],
            self.timeouts.mutation,
        )
    }

    pub fn toggle_job(&self, job_id: &str, enabled: bool) -> Option<String> {
        let action = if enabled { "enable" } else { "disable" };
        self.call_owned(
            vec!["cron".to_string(), action.to_string(), job_id.to_string()],
            self.timeouts.toggle,
        )
    }

    /// The query follows `--` so a leading dash is never read as a flag.
    pub fn memory_search(&self, query: &str, limit: u32) -> Option<String> {
        self.call_owned(
            vec![
                "memory".to_string(),
                "search".to_string(),
                "--json".to_string(),
                "--max-results".to_string(),
                limit.to_string(),
                "--".to_string(),
                query.to_string(),
            ],
            self.timeouts.slow,
        )
    }

    pub fn memory_status(&self) -> Option<String> {
        self.call(&["memory", "status", "--json"], self.timeouts.list)
    }

    pub fn status(&self) -> Option<String> {
        self.call(&["status", "--json"], self.timeouts.list)
    }

    pub fn health(&self) -> Option<String> {
        self.call(&["health", "--json"], self.timeouts.slow)
    }

    /// Plain-text health report, used when the JSON form is unavailable.
    pub fn health_text(&self) -> Option<String> {
        self.call(&["health"], self.timeouts.list)
    }

    pub fn gateway_health(&self) -> Option<String> {
        self.call(&["gateway", "health", "--json"], self.timeouts.slow)
    }

    pub fn gateway_status(&self) -> Option<String> {
        self.call(&["gateway", "status", "--json"], self.timeouts.slow)
    }

    pub fn channels(&self) -> Option<String> {
        self.call(&["channels", "status", "--json"], self.timeouts.slow)
    }

    /// Terminate every running session.
    pub fn kill_all_sessions(&self) -> Option<String> {
        self.call(&["sessions", "kill", "--all", "--json"], self.timeouts.mutation)
    }
}
