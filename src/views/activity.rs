//! Activity feed derived from sessions and scheduled jobs.

use serde::Serialize;

use crate::models::{CronJob, Session, SessionCategory};

/// Maximum number of entries in the feed.
pub const MAX_ACTIVITY_ENTRIES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Session,
    Subagent,
    CronRun,
    CronComplete,
    CronScheduled,
}

/// One entry of the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: String,
    /// ISO 8601 time of the event.
    pub time: String,
    #[serde(skip)]
    pub time_ms: i64,
    pub agent: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

/// Render epoch milliseconds the way the UI expects (`2024-01-01T00:00:00.000Z`).
pub fn iso_time(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// `1234567` -> `1,234,567`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn session_event(session: &Session, now_ms: i64) -> Option<ActivityEvent> {
    let time_ms = session.event_time_ms(now_ms)?;
    let key = session.parsed_key();

    let (kind, label) = match key.category {
        SessionCategory::Cron => (ActivityKind::CronRun, "Cron session"),
        SessionCategory::Subagent => (ActivityKind::Subagent, "Subagent"),
        SessionCategory::Main | SessionCategory::Other(_) => (ActivityKind::Session, "Main session"),
    };
    let tokens = match session.total_tokens {
        Some(n) if n > 0 => format!("{} tokens", format_thousands(n)),
        _ => "tokens unknown".to_string(),
    };
    let id = session
        .session_id
        .as_deref()
        .unwrap_or(session.key.as_str());

    Some(ActivityEvent {
        id: format!("sess-{}", id),
        time: iso_time(time_ms),
        time_ms,
        agent: key.agent_id,
        kind,
        message: format!(
            "{} - {} ({})",
            label,
            session.model.as_deref().unwrap_or("unknown model"),
            tokens
        ),
        model: session.model.clone(),
        tokens: session.total_tokens,
        age_ms: session.age_ms,
        status: None,
        schedule: None,
    })
}

fn job_events(job: &CronJob) -> Vec<ActivityEvent> {
    let mut events = Vec::with_capacity(2);

    if let Some(ms) = job.last_run_at_ms() {
        events.push(ActivityEvent {
            id: format!("cron-{}", job.id),
            time: iso_time(ms),
            time_ms: ms,
            agent: job.agent_or_default().to_string(),
            kind: ActivityKind::CronComplete,
            message: format!("Cron completed: {}", job.name),
            model: None,
            tokens: None,
            age_ms: None,
            status: Some(job.last_result().unwrap_or("ok").to_string()),
            schedule: None,
        });
    }

    if let Some(ms) = job.next_run_at_ms() {
        events.push(ActivityEvent {
            id: format!("cron-next-{}", job.id),
            time: iso_time(ms),
            time_ms: ms,
            agent: job.agent_or_default().to_string(),
            kind: ActivityKind::CronScheduled,
            message: format!("Scheduled: {}", job.name),
            model: None,
            tokens: None,
            age_ms: None,
            status: None,
            schedule: job.schedule_expr().map(str::to_string),
        });
    }

    events
}

/// Merge session and job events, newest first, capped at [`MAX_ACTIVITY_ENTRIES`].
///
/// Sessions without any usable timestamp are left out. Events with equal
/// times keep their merge order (sessions before jobs, input order within).
pub fn build_activity_feed(sessions: &[Session], jobs: &[CronJob], now_ms: i64) -> Vec<ActivityEvent> {
    let mut events: Vec<ActivityEvent> = sessions
        .iter()
        .filter_map(|s| session_event(s, now_ms))
        .chain(jobs.iter().flat_map(job_events))
        .collect();

    events.sort_by(|a, b| b.time_ms.cmp(&a.time_ms));
    events.truncate(MAX_ACTIVITY_ENTRIES);
    events
}
