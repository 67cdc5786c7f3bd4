//! Morning brief: a 24h look back and a 12h look ahead.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::billing::CostToday;
use crate::models::{CronJob, Session};

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;
pub const UPCOMING_WINDOW_MS: i64 = 12 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronRunSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub last_run_at: i64,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingCron {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub next_run_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MorningBrief {
    pub as_of: String,
    pub sessions_since_24h: usize,
    pub active_sessions: usize,
    /// Tokens of the sessions inside the 24h window.
    pub total_tokens: u64,
    pub cron_runs_since_24h: Vec<CronRunSummary>,
    pub upcoming_crons: Vec<UpcomingCron>,
    pub cost_today: Option<CostToday>,
    pub total_cron_jobs: usize,
    pub enabled_cron_jobs: usize,
    pub goals: Option<String>,
}

fn ran_within_day(job: &CronJob, now_ms: i64) -> Option<CronRunSummary> {
    let last = job.last_run_at_ms()?;
    if !(0..DAY_MS).contains(&(now_ms - last)) {
        return None;
    }
    Some(CronRunSummary {
        id: job.id.clone(),
        name: job.name.clone(),
        agent_id: job.agent_id.clone(),
        last_run_at: last,
        result: job.last_result().unwrap_or("unknown").to_string(),
    })
}

fn due_soon(job: &CronJob, now_ms: i64) -> Option<UpcomingCron> {
    if !job.is_enabled() {
        return None;
    }
    let next = job.next_run_at_ms()?;
    if next <= now_ms || next - now_ms >= UPCOMING_WINDOW_MS {
        return None;
    }
    Some(UpcomingCron {
        id: job.id.clone(),
        name: job.name.clone(),
        agent_id: job.agent_id.clone(),
        next_run_at: next,
        schedule: job.schedule_expr().map(str::to_string),
    })
}

pub fn build_morning_brief(
    sessions: &[Session],
    jobs: &[CronJob],
    cost_today: Option<CostToday>,
    goals: Option<String>,
    now: DateTime<Utc>,
) -> MorningBrief {
    let now_ms = now.timestamp_millis();

    let recent: Vec<&Session> = sessions.iter().filter(|s| s.age_within(DAY_MS)).collect();

    let mut upcoming: Vec<UpcomingCron> = jobs.iter().filter_map(|j| due_soon(j, now_ms)).collect();
    upcoming.sort_by_key(|u| u.next_run_at);

    MorningBrief {
        as_of: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        sessions_since_24h: recent.len(),
        active_sessions: sessions.iter().filter(|s| s.is_active()).count(),
        total_tokens: recent.iter().map(|s| s.tokens()).sum(),
        cron_runs_since_24h: jobs.iter().filter_map(|j| ran_within_day(j, now_ms)).collect(),
        upcoming_crons: upcoming,
        cost_today,
        total_cron_jobs: jobs.len(),
        enabled_cron_jobs: jobs.iter().filter(|j| j.is_enabled()).count(),
        goals,
    }
}
