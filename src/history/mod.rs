//! Daily history snapshots for the dashboard charts.
//!
//! One file per UTC day, `<history-dir>/<YYYY-MM-DD>.json`. Taking a
//! second snapshot on the same day replaces the figures but keeps the
//! first timestamp and counts the update.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::billing::{self, BillingApi, BillingUsage};
use crate::config::DashboardConfig;
use crate::models::{CronJob, Session, SessionCategory, parse_items};
use crate::normalize::normalize_list;
use crate::platform::OpenClaw;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionCounts {
    pub total: usize,
    pub main: usize,
    pub cron: usize,
    pub subagent: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobCounts {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
}

/// Contents of one day's snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub date: String,
    pub timestamp: String,
    pub sessions: SessionCounts,
    pub total_tokens: u64,
    /// Model name to number of sessions using it.
    pub model_usage: BTreeMap<String, usize>,
    pub cron_jobs: JobCounts,
    pub cost: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updates: Option<u64>,
}

impl Snapshot {
    pub fn collect(sessions: &[Session], jobs: &[CronJob], cost: &BillingUsage, now: DateTime<Utc>) -> Self {
        let mut counts = SessionCounts {
            total: sessions.len(),
            ..Default::default()
        };
        let mut model_usage = BTreeMap::new();
        for session in sessions {
            match session.parsed_key().category {
                SessionCategory::Main => counts.main += 1,
                SessionCategory::Cron => counts.cron += 1,
                SessionCategory::Subagent => counts.subagent += 1,
                SessionCategory::Other(_) => {}
            }
            if let Some(model) = &session.model {
                *model_usage.entry(model.clone()).or_insert(0) += 1;
            }
        }

        let enabled = jobs.iter().filter(|j| j.is_enabled()).count();

        Self {
            date: now.format("%Y-%m-%d").to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            sessions: counts,
            total_tokens: sessions.iter().map(|s| s.tokens()).sum(),
            model_usage,
            cron_jobs: JobCounts {
                total: jobs.len(),
                enabled,
                disabled: jobs.len() - enabled,
            },
            cost: snapshot_cost(cost),
            first_timestamp: None,
            updates: None,
        }
    }

    /// Carry the first timestamp and update count over from an earlier
    /// snapshot of the same day.
    pub fn merge_previous(&mut self, previous: &Value) {
        let first = previous
            .get("firstTimestamp")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| previous.get("timestamp").and_then(Value::as_str));
        self.first_timestamp = first.map(str::to_string);
        let updates = previous.get("updates").and_then(Value::as_u64).unwrap_or(0);
        self.updates = Some(updates + 1);
    }
}

/// Billing figures as stored in history files, where the running total is
/// `totalUsage` rather than the `usage` key the API responses use.
fn snapshot_cost(usage: &BillingUsage) -> Value {
    let mut cost = serde_json::to_value(usage).unwrap_or(Value::Null);
    if let Some(map) = cost.as_object_mut() {
        if let Some(total) = map.remove("usage") {
            map.insert("totalUsage".to_string(), total);
        }
    }
    cost
}

pub fn snapshot_path(dir: &Path, date: &str) -> PathBuf {
    dir.join(format!("{}.json", date))
}

/// Write `snapshot` into `dir`, merging with an existing file for the same day.
///
/// An existing file that cannot be parsed is overwritten. Returns the
/// written path.
pub fn save_snapshot(dir: &Path, snapshot: &mut Snapshot) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = snapshot_path(dir, &snapshot.date);

    if let Ok(content) = std::fs::read_to_string(&path) {
        match serde_json::from_str::<Value>(&content) {
            Ok(previous) => snapshot.merge_previous(&previous),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "replacing unreadable snapshot");
            }
        }
    }

    let json = serde_json::to_string_pretty(snapshot)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(json.as_bytes())?;
    file.persist(&path).map_err(|e| Error::Io(e.error))?;

    tracing::info!(path = %path.display(), sessions = snapshot.sessions.total, "snapshot saved");
    Ok(path)
}

/// Collect today's figures from the CLI and the billing API and save them.
pub fn record_snapshot(
    config: &DashboardConfig,
    cli: &OpenClaw,
    billing_api: &dyn BillingApi,
    now: DateTime<Utc>,
) -> Result<(PathBuf, Snapshot)> {
    let sessions: Vec<Session> = parse_items(&normalize_list(cli.list_sessions().as_deref(), "sessions"));
    let jobs: Vec<CronJob> = parse_items(&normalize_list(cli.list_jobs().as_deref(), "jobs"));
    let key = billing::resolve_api_key(config);
    let usage = billing::fetch_usage(billing_api, key.as_deref());

    let mut snapshot = Snapshot::collect(&sessions, &jobs, &usage, now);
    let path = save_snapshot(&config.history_dir(), &mut snapshot)?;
    Ok((path, snapshot))
}

/// Read snapshots in file-name (date) order, keeping only the last `last_n`
/// files when given. Unparseable files are skipped.
///
/// Fails with [`Error::NotFound`] when the directory does not exist.
pub fn list_snapshots(dir: &Path, last_n: Option<usize>) -> Result<Vec<Value>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(dir.display().to_string()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();

    if let Some(n) = last_n {
        let skip = files.len().saturating_sub(n);
        files.drain(..skip);
    }

    Ok(files
        .iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(path).ok()?;
            match serde_json::from_str(&content) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping snapshot");
                    None
                }
            }
        })
        .collect())
}
