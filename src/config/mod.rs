//! Configuration for the dashboard proxy.
//!
//! Two distinct sources feed the proxy:
//!
//! ## DashboardConfig - resolved once at process start
//!
//! Built from CLI flags (which fall back to environment variables, then to
//! defaults) and shared by reference with every request handler. Handlers
//! never read the process environment themselves.
//!
//! ## PlatformConfig - `<platform-home>/openclaw.json`
//!
//! Owned by the agent platform and re-read on every request that needs it,
//! so edits show up without restarting the proxy. See [`platform`].

pub mod platform;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use platform::{AgentEntry, ModelEntry, PlatformConfig, SanitizedConfig};

/// Default OpenClaw binary name, resolved on `PATH`.
pub const DEFAULT_CLI_BIN: &str = "openclaw";

/// Default OpenRouter API base.
pub const DEFAULT_BILLING_URL: &str = "https://openrouter.ai/api/v1";

/// Per-call timeouts, grouped by how long the upstream call is expected to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// Status and list calls.
    pub list: Duration,
    /// Memory search, health, gateway and channel probes.
    pub slow: Duration,
    /// Enabling or disabling a job.
    pub toggle: Duration,
    /// Triggering a job run or killing sessions.
    pub mutation: Duration,
    /// The billing HTTP call.
    pub billing: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(15),
            slow: Duration::from_secs(20),
            toggle: Duration::from_secs(15),
            mutation: Duration::from_secs(30),
            billing: Duration::from_secs(10),
        }
    }
}

/// Explicit configuration handed to every handler.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Platform home directory (e.g. `~/.openclaw`).
    pub platform_home: PathBuf,
    /// OpenClaw CLI binary.
    pub cli_bin: PathBuf,
    /// Dashboard data directory (history snapshots, PID file).
    pub data_dir: PathBuf,
    /// Billing API base URL, without a trailing slash.
    pub billing_url: String,
    /// Billing key that takes precedence over the platform config.
    pub billing_key_override: Option<String>,
    pub timeouts: Timeouts,
}

impl DashboardConfig {
    /// Build a configuration with default timeouts.
    ///
    /// `platform_home` and `data_dir` default to `~/.openclaw` and the
    /// platform data directory (`~/.local/share/jerry-dash` on Linux).
    pub fn new(
        platform_home: Option<PathBuf>,
        cli_bin: Option<PathBuf>,
        data_dir: Option<PathBuf>,
        billing_url: Option<String>,
        billing_key_override: Option<String>,
    ) -> Self {
        let platform_home = platform_home.unwrap_or_else(default_platform_home);
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        let billing_url = billing_url
            .unwrap_or_else(|| DEFAULT_BILLING_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            platform_home,
            cli_bin: cli_bin.unwrap_or_else(|| PathBuf::from(DEFAULT_CLI_BIN)),
            data_dir,
            billing_url,
            billing_key_override: billing_key_override.filter(|k| !k.trim().is_empty()),
            timeouts: Timeouts::default(),
        }
    }

    /// Configuration rooted entirely under `root`, for tests and sandboxes.
    pub fn rooted_at(root: &Path) -> Self {
        Self::new(
            Some(root.join("platform")),
            None,
            Some(root.join("data")),
            None,
            None,
        )
    }

    pub fn platform_config_path(&self) -> PathBuf {
        self.platform_home.join("openclaw.json")
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.platform_home.join("workspace")
    }

    /// Sandbox root for `/api/memory/content`.
    pub fn memory_dir(&self) -> PathBuf {
        self.workspace_dir().join("memory")
    }

    pub fn brain_dir(&self) -> PathBuf {
        self.platform_home.join("brain")
    }

    pub fn goals_file(&self) -> PathBuf {
        self.brain_dir().join("goals").join("goals.md")
    }

    pub fn history_dir(&self) -> PathBuf {
        self.data_dir.join("history")
    }

    /// Read the platform config, if present and parseable.
    pub fn load_platform_config(&self) -> Option<PlatformConfig> {
        PlatformConfig::load(&self.platform_config_path())
    }
}

fn default_platform_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".openclaw")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jerry-dash")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_derived_paths() {
        let config = DashboardConfig::new(
            Some(PathBuf::from("/home/op/.openclaw")),
            None,
            Some(PathBuf::from("/var/jerry")),
            None,
            None,
        );

        assert_eq!(
            config.platform_config_path(),
            PathBuf::from("/home/op/.openclaw/openclaw.json")
        );
        assert_eq!(
            config.memory_dir(),
            PathBuf::from("/home/op/.openclaw/workspace/memory")
        );
        assert_eq!(
            config.goals_file(),
            PathBuf::from("/home/op/.openclaw/brain/goals/goals.md")
        );
        assert_eq!(config.history_dir(), PathBuf::from("/var/jerry/history"));
        assert_eq!(config.cli_bin, PathBuf::from(DEFAULT_CLI_BIN));
    }

    #[test]
    fn test_billing_url_trailing_slash_trimmed() {
        let config = DashboardConfig::new(
            None,
            None,
            None,
            Some("http://localhost:9999/api/".to_string()),
            None,
        );
        assert_eq!(config.billing_url, "http://localhost:9999/api");
    }

    #[test]
    fn test_blank_key_override_is_ignored() {
        let config = DashboardConfig::new(None, None, None, None, Some("  ".to_string()));
        assert!(config.billing_key_override.is_none());

        let config = DashboardConfig::new(None, None, None, None, Some("sk-or-1".to_string()));
        assert_eq!(config.billing_key_override.as_deref(), Some("sk-or-1"));
    }

    #[test]
    fn test_default_timeouts() {
        let t = Timeouts::default();
        assert_eq!(t.list, Duration::from_secs(15));
        assert_eq!(t.slow, Duration::from_secs(20));
        assert_eq!(t.mutation, Duration::from_secs(30));
        assert!(t.list < t.slow);
    }

    #[test]
    fn test_load_platform_config_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let config = DashboardConfig::rooted_at(temp.path());
        assert!(config.load_platform_config().is_none());
    }
}
