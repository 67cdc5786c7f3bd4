//! Subprocess invocation with a bounded wait.
//!
//! [`ProcessRunner`] runs one external command to completion and hands
//! its stdout to the normalization layer. Timeouts, non-zero exits and
//! spawn failures are not distinguished past this boundary: each one is
//! logged and surfaces as `None`.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

/// Environment applied to every child so its output carries no ANSI codes.
pub const PLAIN_OUTPUT_ENV: &[(&str, &str)] =
    &[("NO_COLOR", "1"), ("FORCE_COLOR", "0"), ("TERM", "dumb")];

/// One fully assembled external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute (looked up on `PATH` when not absolute).
    pub program: PathBuf,
    /// Arguments, passed through verbatim (no shell).
    pub args: Vec<String>,
    /// Upper bound on the wait for the child to exit.
    pub timeout: Duration,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// Human-readable command line, for logs only.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Everything observed about one finished (or abandoned) child process.
#[derive(Debug)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the child was killed after the timeout fired.
    pub status: Option<ExitStatus>,
    pub elapsed: Duration,
    /// The child, or something holding its pipes, outlived the timeout.
    pub timed_out: bool,
}

impl RawOutput {
    /// Whether the output is usable by the normalization layer.
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.status.is_some_and(|s| s.success())
    }
}

/// Runs invocations and yields their stdout, or `None` on any failure.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Option<String>;
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Spawn the child and wait for it, capturing everything observed.
    ///
    /// Only a spawn failure is an error here; exit status and timeout are
    /// reported in the returned [`RawOutput`].
    pub fn capture(&self, invocation: &Invocation) -> std::io::Result<RawOutput> {
        let started = Instant::now();

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in PLAIN_OUTPUT_ENV {
            command.env(key, value);
        }

        let mut child = command.spawn()?;

        // Drain both pipes while waiting so a chatty child cannot block on
        // a full pipe buffer.
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let (status, mut timed_out) = match child.wait_timeout(invocation.timeout)? {
            Some(status) => (Some(status), false),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                (None, true)
            }
        };

        // A grandchild can keep the pipes open after the child exits, so the
        // readers share the same deadline. Readers left behind are detached.
        let deadline = started + invocation.timeout;
        let (mut stdout, mut stderr) = (String::new(), String::new());
        if !timed_out {
            match (
                collect_reader(stdout_reader, deadline),
                collect_reader(stderr_reader, deadline),
            ) {
                (Some(out), Some(err)) => {
                    stdout = out;
                    stderr = err;
                }
                _ => timed_out = true,
            }
        }

        Ok(RawOutput {
            stdout,
            stderr,
            status,
            elapsed: started.elapsed(),
            timed_out,
        })
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Option<String> {
        let command_line = invocation.display();
        match self.capture(invocation) {
            Ok(output) if output.succeeded() => {
                tracing::debug!(
                    command = %command_line,
                    elapsed_ms = output.elapsed.as_millis() as u64,
                    bytes = output.stdout.len(),
                    "CLI call succeeded"
                );
                Some(output.stdout)
            }
            Ok(output) if output.timed_out => {
                tracing::warn!(
                    command = %command_line,
                    timeout_ms = invocation.timeout.as_millis() as u64,
                    "CLI call timed out"
                );
                None
            }
            Ok(output) => {
                tracing::warn!(
                    command = %command_line,
                    status = ?output.status,
                    stderr = %output.stderr.trim(),
                    "CLI call exited unsuccessfully"
                );
                None
            }
            Err(e) => {
                tracing::warn!(command = %command_line, error = %e, "CLI call could not be spawned");
                None
            }
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Text read from one pipe, or `None` if it was still open at `deadline`.
fn collect_reader(reader: Option<mpsc::Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(rx) = reader else {
        return Some(String::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
        Err(mpsc::RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}
