//! CLI argument definitions for jerry-dash.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Jerry Dash - normalization proxy behind the Jerry OS dashboard.
///
/// Start the API with `jerry-dash serve`, then point the UI at it.
#[derive(Parser, Debug)]
#[command(name = "jerry-dash")]
#[command(author, version, about = "Normalization proxy for the Jerry OS dashboard", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// OpenClaw home directory (config, workspace, brain). Defaults to ~/.openclaw
    #[arg(long, global = true, env = "JERRY_PLATFORM_HOME")]
    pub platform_home: Option<PathBuf>,

    /// OpenClaw CLI binary
    #[arg(long, global = true, env = "JERRY_CLI_BIN")]
    pub cli_bin: Option<PathBuf>,

    /// Directory for history snapshots and the server PID file
    #[arg(long, global = true, env = "JERRY_DASH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// OpenRouter API base URL
    #[arg(long, global = true, env = "JERRY_BILLING_URL")]
    pub billing_url: Option<String>,

    /// OpenRouter API key; overrides the key in openclaw.json
    #[arg(long, global = true, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub billing_key: Option<String>,

    /// Log filter when RUST_LOG is unset (e.g. info, debug, jerry_dash=trace)
    #[arg(long, global = true, env = "JERRY_DASH_LOG", default_value = "info")]
    pub log_level: String,

    /// Also write logs to daily-rotated files in this directory
    #[arg(long, global = true, env = "JERRY_DASH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the dashboard API server
    Serve {
        /// Port to listen on (default: first free port from 3001)
        #[arg(short, long, env = "JERRY_DASH_PORT")]
        port: Option<u16>,

        /// Host address to bind to (use 0.0.0.0 for network access)
        #[arg(long, env = "JERRY_DASH_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Serve the built UI bundle from this directory
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Show status of a running server and exit
        #[arg(long, conflicts_with_all = ["stop", "replace"])]
        status: bool,

        /// Stop a running server gracefully (SIGTERM, then SIGKILL after timeout)
        #[arg(long, conflicts_with = "replace")]
        stop: bool,

        /// Stop any running server and start a new one
        #[arg(long)]
        replace: bool,
    },

    /// Record today's history snapshot (sessions, jobs, cost)
    Snapshot,

    /// Normalize CLI output read from stdin and print the JSON value
    Normalize {
        /// JSON value printed when stdin holds no usable JSON
        #[arg(long, default_value = "null")]
        fallback: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["jerry-dash", "serve"]).unwrap();
        match cli.command {
            Commands::Serve {
                host, status, stop, replace, ..
            } => {
                assert_eq!(host, "127.0.0.1");
                assert!(!status && !stop && !replace);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_status_conflicts_with_stop() {
        assert!(Cli::try_parse_from(["jerry-dash", "serve", "--status", "--stop"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "jerry-dash",
            "snapshot",
            "--platform-home",
            "/tmp/oc",
            "-H",
        ])
        .unwrap();
        assert!(cli.human_readable);
        assert_eq!(cli.platform_home, Some(PathBuf::from("/tmp/oc")));
    }
}
