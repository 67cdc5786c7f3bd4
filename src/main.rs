//! Jerry Dash CLI - normalization proxy behind the Jerry OS dashboard.

use clap::Parser;
use jerry_dash::api::{self, AppState, DEFAULT_PORT, ProcessStatus, ServerPidFile, ServerPidInfo};
use jerry_dash::billing::OpenRouterApi;
use jerry_dash::cli::{Cli, Commands};
use jerry_dash::config::DashboardConfig;
use jerry_dash::platform::OpenClaw;
use jerry_dash::runner::ProcessRunner;
use jerry_dash::{Error, history, normalize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const KILL_SETTLE: Duration = Duration::from_millis(500);

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    // Held for the life of the process so buffered file logs get flushed.
    let _log_guard = init_logging(&cli.log_level, cli.log_dir.as_deref());

    let config = DashboardConfig::new(
        cli.platform_home,
        cli.cli_bin,
        cli.data_dir,
        cli.billing_url,
        cli.billing_key,
    );

    if let Err(e) = run_command(cli.command, config, human) {
        tracing::error!(error = %e, "command failed");
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Log to stderr, and to daily-rotated JSON files when `log_dir` is set.
///
/// `RUST_LOG` wins over `level` when present.
fn init_logging(level: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter());

    let (file_layer, guard) = match log_dir.map(file_appender) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("Warning: file logging disabled: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}

fn file_appender(
    dir: &Path,
) -> Result<tracing_appender::rolling::RollingFileAppender, tracing_appender::rolling::InitError> {
    tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("jerry-dash")
        .filename_suffix("log")
        .build(dir)
}

fn run_command(command: Commands, config: DashboardConfig, human: bool) -> Result<(), Error> {
    match command {
        Commands::Serve {
            port,
            host,
            static_dir,
            status,
            stop,
            replace,
        } => {
            if status {
                show_server_status(&config, human)
            } else if stop {
                stop_server(&config, human)
            } else {
                serve(config, port, &host, static_dir, replace, human)
            }
        }
        Commands::Snapshot => take_snapshot(&config, human),
        Commands::Normalize { fallback } => normalize_stdin(&fallback, human),
    }
}

fn serve(
    config: DashboardConfig,
    port: Option<u16>,
    host: &str,
    static_dir: Option<PathBuf>,
    replace: bool,
    human: bool,
) -> Result<(), Error> {
    let pid_file = ServerPidFile::new(&config.data_dir);

    if let Some((status, info)) = check_pid_file(&pid_file)? {
        match status {
            ProcessStatus::Running if !replace => {
                return Err(Error::Other(format!(
                    "Server already running (PID {}) at http://{}:{}. Use --replace to restart it.",
                    info.pid, info.host, info.port
                )));
            }
            ProcessStatus::Running => {
                if human {
                    println!("Stopping existing server (PID: {})...", info.pid);
                }
                terminate(&pid_file, info.pid, human);
            }
            ProcessStatus::Stale | ProcessStatus::NotRunning => {}
        }
        pid_file.delete().ok();
    }

    if let Some(dir) = static_dir.as_ref().filter(|d| !d.is_dir()) {
        return Err(Error::InvalidInput(format!(
            "Static directory not found: {}",
            dir.display()
        )));
    }

    let actual_port = match port {
        Some(p) => p,
        None => api::find_available_port(host, DEFAULT_PORT).ok_or_else(|| {
            Error::Other(format!(
                "Could not find an available port starting from {}",
                DEFAULT_PORT
            ))
        })?,
    };

    pid_file
        .write(&ServerPidInfo {
            pid: process::id(),
            port: actual_port,
            host: host.to_string(),
        })
        .map_err(|e| Error::Other(format!("Failed to write PID file: {}", e)))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("JERRY_DASH_GIT_COMMIT"),
        built = env!("JERRY_DASH_BUILD_TIMESTAMP"),
        platform_home = %config.platform_home.display(),
        "starting jerry-dash"
    );

    let state = AppState::new(config);
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Other(format!("Failed to create runtime: {}", e)))?
        .block_on(async {
            api::start_server(state, host, actual_port, static_dir)
                .await
                .map_err(|e| Error::Other(format!("Server error: {}", e)))
        });

    // Whether the server stopped cleanly or not.
    pid_file.delete().ok();

    result
}

fn check_pid_file(pid_file: &ServerPidFile) -> Result<Option<(ProcessStatus, ServerPidInfo)>, Error> {
    pid_file
        .check_running()
        .map_err(|e| Error::Other(format!("Failed to check PID file: {}", e)))
}

fn show_server_status(config: &DashboardConfig, human: bool) -> Result<(), Error> {
    let pid_file = ServerPidFile::new(&config.data_dir);

    match check_pid_file(&pid_file)? {
        Some((status, info)) => {
            if human {
                match status {
                    ProcessStatus::Running => {
                        println!("Dashboard server is running");
                        println!("  PID:  {}", info.pid);
                        println!("  Port: {}", info.port);
                        println!("  Host: {}", info.host);
                        println!("  URL:  http://{}:{}", info.host, info.port);
                    }
                    ProcessStatus::NotRunning => {
                        println!("Dashboard server is not running (stale PID file found)");
                        println!("  Last PID:  {}", info.pid);
                        println!("  Last Port: {}", info.port);
                    }
                    ProcessStatus::Stale => {
                        println!(
                            "Dashboard server is not running (PID {} is not serving port {})",
                            info.pid, info.port
                        );
                    }
                }
            } else {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": status.as_str(),
                        "pid": info.pid,
                        "port": info.port,
                        "host": info.host,
                    })
                );
            }
        }
        None => {
            if human {
                println!("Dashboard server is not running (no PID file)");
            } else {
                println!(r#"{{"status":"not_running"}}"#);
            }
        }
    }

    Ok(())
}

fn stop_server(config: &DashboardConfig, human: bool) -> Result<(), Error> {
    let pid_file = ServerPidFile::new(&config.data_dir);

    match check_pid_file(&pid_file)? {
        Some((ProcessStatus::Running, info)) => {
            if human {
                println!("Stopping dashboard server (PID: {})...", info.pid);
            }
            let method = terminate(&pid_file, info.pid, human);
            pid_file.delete().ok();
            if human {
                println!("Dashboard server stopped");
            } else {
                println!(
                    "{}",
                    serde_json::json!({ "status": "stopped", "pid": info.pid, "method": method })
                );
            }
        }
        Some(_) => {
            pid_file.delete().ok();
            if human {
                println!("Dashboard server is not running (cleaned up stale PID file)");
            } else {
                println!(r#"{{"status":"not_running","cleaned_stale":true}}"#);
            }
        }
        None => {
            if human {
                println!("Dashboard server is not running");
            } else {
                println!(r#"{{"status":"not_running"}}"#);
            }
        }
    }

    Ok(())
}

/// SIGTERM, wait for the server to go away, then SIGKILL. Returns how it ended.
fn terminate(pid_file: &ServerPidFile, pid: u32, human: bool) -> &'static str {
    if !send_signal(pid, Signal::Term) {
        return "already_gone";
    }

    let deadline = Instant::now() + GRACEFUL_TIMEOUT;
    loop {
        thread::sleep(POLL_INTERVAL);
        match pid_file.check_running() {
            Ok(Some((ProcessStatus::Running, _))) => {
                if Instant::now() >= deadline {
                    if human {
                        println!("Graceful shutdown timed out, forcing termination...");
                    }
                    tracing::warn!(pid, "server ignored SIGTERM, killing");
                    send_signal(pid, Signal::Kill);
                    thread::sleep(KILL_SETTLE);
                    return "sigkill";
                }
            }
            _ => return "sigterm",
        }
    }
}

enum Signal {
    Term,
    Kill,
}

/// Send a signal to a process. Returns false if the process doesn't exist.
#[cfg(unix)]
fn send_signal(pid: u32, signal: Signal) -> bool {
    let signal_str = match signal {
        Signal::Term => "-TERM",
        Signal::Kill => "-KILL",
    };

    process::Command::new("kill")
        .args([signal_str, &pid.to_string()])
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn send_signal(pid: u32, signal: Signal) -> bool {
    let pid = pid.to_string();
    let args = match signal {
        Signal::Term => vec!["/PID", pid.as_str()],
        Signal::Kill => vec!["/F", "/PID", pid.as_str()],
    };

    process::Command::new("taskkill")
        .args(&args)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn take_snapshot(config: &DashboardConfig, human: bool) -> Result<(), Error> {
    let cli = OpenClaw::from_config(Arc::new(ProcessRunner::new()), config);
    let billing = OpenRouterApi::from_config(config);

    let (path, snapshot) = history::record_snapshot(config, &cli, &billing, chrono::Utc::now())?;

    if human {
        println!("Saved snapshot for {} to {}", snapshot.date, path.display());
        println!(
            "  Sessions: {} ({} main, {} cron, {} subagent)",
            snapshot.sessions.total,
            snapshot.sessions.main,
            snapshot.sessions.cron,
            snapshot.sessions.subagent
        );
        println!("  Tokens:   {}", snapshot.total_tokens);
        println!(
            "  Cron:     {} jobs, {} enabled",
            snapshot.cron_jobs.total, snapshot.cron_jobs.enabled
        );
        if let Some(updates) = snapshot.updates {
            println!("  Updates today: {}", updates);
        }
    } else {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "date": snapshot.date,
                "sessions": snapshot.sessions.total,
                "totalTokens": snapshot.total_tokens,
                "updates": snapshot.updates.unwrap_or(0),
            })
        );
    }

    Ok(())
}

fn normalize_stdin(fallback: &str, human: bool) -> Result<(), Error> {
    let fallback: serde_json::Value = serde_json::from_str(fallback)
        .map_err(|e| Error::InvalidInput(format!("--fallback is not valid JSON: {}", e)))?;

    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;

    let normalized = normalize::normalize_detailed(Some(&raw), fallback);
    if let Some(failure) = &normalized.failure {
        tracing::debug!(reason = %failure, "stdin fell back");
    }

    let text = if human {
        serde_json::to_string_pretty(&normalized.value)?
    } else {
        serde_json::to_string(&normalized.value)?
    };
    println!("{}", text);
    Ok(())
}
