//! Endpoint handlers.
//!
//! Every upstream call is blocking (subprocess or `ureq`), so it runs on
//! the blocking pool. Upstream failures never become error statuses: each
//! endpoint answers with its documented fallback shape instead. Only bad
//! client input (400) and sandbox violations (403) use non-200 codes.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::server::AppState;
use crate::billing::{self, BillingUsage, CostToday};
use crate::history;
use crate::models::{CronJob, Session, parse_items};
use crate::normalize::{normalize_detailed, normalize_list};
use crate::platform::OpenClaw;
use crate::views::{self, DASHBOARD_HISTORY_DAYS};
use crate::workspace;
use crate::Error;

type ApiError = (StatusCode, Json<Value>);
type ApiResult = Result<Json<Value>, ApiError>;

const DEFAULT_RUNS_LIMIT: u32 = 10;
const DEFAULT_SEARCH_LIMIT: u32 = 20;
const GOALS_DISPLAY_PATH: &str = "brain/goals/goals.md";

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message.into() })))
}

fn forbidden() -> ApiError {
    (StatusCode::FORBIDDEN, Json(json!({ "error": "Invalid path" })))
}

/// Required string parameter: present and not blank.
fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| bad_request(format!("{} is required", field)))
}

/// Job ids go to the CLI as positional arguments; refuse anything it could
/// read as a flag.
fn job_id(value: &Option<String>) -> Result<String, ApiError> {
    let id = required(value, "jobId")?;
    if id.starts_with('-') {
        return Err(bad_request("jobId is invalid"));
    }
    Ok(id.to_string())
}

/// Lenient limit: anything that is not a positive integer means `default`.
fn limit_or(value: &Option<String>, default: u32) -> u32 {
    value
        .as_deref()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

/// Run blocking work off the async executor.
async fn blocking<T, F>(f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, "blocking task failed");
            None
        }
    }
}

/// Raw stdout of one CLI call, `None` on any failure.
async fn cli_raw<F>(state: &AppState, call: F) -> Option<String>
where
    F: FnOnce(&OpenClaw) -> Option<String> + Send + 'static,
{
    let cli = state.cli.clone();
    blocking(move || call(cli.as_ref())).await.flatten()
}

/// One CLI call, normalized, with `fallback` on any failure.
async fn cli_json<F>(state: &AppState, what: &'static str, call: F, fallback: Value) -> Value
where
    F: FnOnce(&OpenClaw) -> Option<String> + Send + 'static,
{
    let raw = cli_raw(state, call).await;
    let normalized = normalize_detailed(raw.as_deref(), fallback);
    if let Some(failure) = &normalized.failure {
        tracing::warn!(call = what, reason = %failure, "upstream unusable, using fallback");
    }
    normalized.value
}

async fn session_values(state: &AppState) -> Vec<Value> {
    normalize_list(cli_raw(state, |c| c.list_sessions()).await.as_deref(), "sessions")
}

async fn job_values(state: &AppState) -> Vec<Value> {
    normalize_list(cli_raw(state, |c| c.list_jobs()).await.as_deref(), "jobs")
}

async fn billing_usage(state: &AppState) -> BillingUsage {
    let config = state.config.clone();
    let api = state.billing.clone();
    blocking(move || {
        let key = billing::resolve_api_key(&config);
        billing::fetch_usage(api.as_ref(), key.as_deref())
    })
    .await
    .unwrap_or_else(|| BillingUsage::disconnected(billing::UNAVAILABLE_ERROR))
}

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult {
    serde_json::to_value(value).map(Json).map_err(|e| {
        tracing::error!(error = %e, "response serialization failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })
}

pub async fn sessions(State(state): State<AppState>) -> Json<Value> {
    Json(cli_json(&state, "sessions list", |c| c.list_sessions(), json!({ "sessions": [] })).await)
}

pub async fn cron_list(State(state): State<AppState>) -> Json<Value> {
    Json(cli_json(&state, "cron list", |c| c.list_jobs(), json!({ "jobs": [] })).await)
}

pub async fn cron_status(State(state): State<AppState>) -> Json<Value> {
    Json(cli_json(&state, "cron status", |c| c.cron_status(), json!({})).await)
}

#[derive(Debug, Default, Deserialize)]
pub struct RunsQuery {
    #[serde(rename = "jobId", alias = "id")]
    job_id: Option<String>,
    limit: Option<String>,
}

pub async fn cron_runs(State(state): State<AppState>, Query(query): Query<RunsQuery>) -> ApiResult {
    let id = job_id(&query.job_id)?;
    let limit = limit_or(&query.limit, DEFAULT_RUNS_LIMIT);

    let value = cli_json(&state, "cron runs", move |c| c.cron_runs(&id, limit), json!({})).await;
    let runs = ["entries", "runs"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array).cloned())
        .unwrap_or_default();

    Ok(Json(json!({ "runs": runs })))
}

#[derive(Debug, Default, Deserialize)]
pub struct JobRequest {
    #[serde(rename = "jobId", alias = "id")]
    job_id: Option<String>,
    enabled: Option<bool>,
}

pub async fn cron_run(State(state): State<AppState>, body: Option<Json<JobRequest>>) -> ApiResult {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let id = job_id(&request.job_id)?;

    let run_id = id.clone();
    let success = cli_raw(&state, move |c| c.run_job(&run_id)).await.is_some();
    tracing::info!(job_id = %id, success, "job run requested");

    Ok(Json(json!({ "success": success, "jobId": id })))
}

pub async fn cron_toggle(State(state): State<AppState>, body: Option<Json<JobRequest>>) -> ApiResult {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let id = job_id(&request.job_id)?;
    let enabled = request
        .enabled
        .ok_or_else(|| bad_request("enabled is required"))?;

    let toggle_id = id.clone();
    let success = cli_raw(&state, move |c| c.toggle_job(&toggle_id, enabled))
        .await
        .is_some();
    let action = if enabled { "enable" } else { "disable" };
    tracing::info!(job_id = %id, action, success, "job toggle requested");

    Ok(Json(json!({ "success": success, "action": action, "jobId": id })))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(cli_json(&state, "status", |c| c.status(), json!({})).await)
}

/// JSON health report; the plain-text report wrapped as `{raw}` when the
/// JSON form is unavailable.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let value = cli_json(&state, "health", |c| c.health(), Value::Null).await;
    if !value.is_null() {
        return Json(value);
    }

    match cli_raw(&state, |c| c.health_text()).await {
        Some(text) if !text.trim().is_empty() => Json(json!({ "raw": text.trim() })),
        _ => Json(json!({})),
    }
}

pub async fn activity(State(state): State<AppState>) -> Json<Value> {
    let (sessions, jobs) = tokio::join!(session_values(&state), job_values(&state));
    let sessions: Vec<Session> = parse_items(&sessions);
    let jobs: Vec<CronJob> = parse_items(&jobs);

    let now_ms = chrono::Utc::now().timestamp_millis();
    let activities = views::build_activity_feed(&sessions, &jobs, now_ms);

    Json(json!({ "activities": activities }))
}

pub async fn brief(State(state): State<AppState>) -> ApiResult {
    let (sessions, jobs, usage) = tokio::join!(
        session_values(&state),
        job_values(&state),
        billing_usage(&state)
    );
    let sessions: Vec<Session> = parse_items(&sessions);
    let jobs: Vec<CronJob> = parse_items(&jobs);
    let cost_today = usage.figures.as_ref().map(CostToday::from);

    let goals_file = state.config.goals_file();
    let goals = blocking(move || workspace::read_goals(&goals_file))
        .await
        .flatten();

    let brief = views::build_morning_brief(&sessions, &jobs, cost_today, goals, chrono::Utc::now());
    to_json(&brief)
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResult {
    let config = state.config.clone();
    let local = blocking(move || {
        let snapshots = match history::list_snapshots(&config.history_dir(), Some(DASHBOARD_HISTORY_DAYS)) {
            Ok(snapshots) => snapshots,
            Err(e) => {
                tracing::debug!(error = %e, "no history snapshots");
                Vec::new()
            }
        };
        (snapshots, config.load_platform_config())
    });

    let (sessions, jobs, usage, local) = tokio::join!(
        session_values(&state),
        job_values(&state),
        billing_usage(&state),
        local
    );
    let (snapshots, platform) = local.unwrap_or_default();

    let dashboard = views::build_dashboard(sessions, jobs, usage, snapshots, platform.as_ref());
    to_json(&dashboard)
}

pub async fn history(State(state): State<AppState>) -> Json<Value> {
    let dir = state.config.history_dir();
    let result = blocking(move || history::list_snapshots(&dir, None)).await;

    match result {
        Some(Ok(snapshots)) => Json(json!({ "snapshots": snapshots })),
        Some(Err(Error::NotFound(_))) => Json(json!({
            "snapshots": [],
            "error": "No history data yet. Run `jerry-dash snapshot` to populate."
        })),
        Some(Err(e)) => Json(json!({ "snapshots": [], "error": e.to_string() })),
        None => Json(json!({ "snapshots": [] })),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    limit: Option<String>,
}

pub async fn memory_search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> ApiResult {
    let q = required(&query.q, "q")?.to_string();
    let limit = limit_or(&query.limit, DEFAULT_SEARCH_LIMIT);

    let value = cli_json(
        &state,
        "memory search",
        move |c| c.memory_search(&q, limit),
        json!({ "results": [] }),
    )
    .await;

    let results = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    Ok(Json(json!({ "results": results })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    path: Option<String>,
}

pub async fn memory_content(State(state): State<AppState>, Query(query): Query<ContentQuery>) -> ApiResult {
    let requested = required(&query.path, "path")?.to_string();
    let root = state.config.memory_dir();

    let shown = requested.clone();
    let result = blocking(move || workspace::read_sandboxed(&root, &requested))
        .await
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "content": null, "error": "read task failed" })),
            )
        })?;

    match result {
        Ok(Some(content)) => Ok(Json(json!({ "content": content, "path": shown }))),
        Ok(None) => Ok(Json(json!({ "content": null, "error": "File not found" }))),
        Err(Error::PathEscape(_)) => {
            tracing::warn!(path = %shown, "rejected memory path outside the sandbox");
            Err(forbidden())
        }
        Err(e) => Ok(Json(json!({ "content": null, "error": e.to_string() }))),
    }
}

pub async fn memory_status(State(state): State<AppState>) -> Json<Value> {
    Json(
        cli_json(
            &state,
            "memory status",
            |c| c.memory_status(),
            json!({ "error": "Failed to fetch memory status" }),
        )
        .await,
    )
}

pub async fn goals(State(state): State<AppState>) -> Json<Value> {
    let path = state.config.goals_file();
    let result = blocking(move || workspace::read_text(&path)).await;

    match result {
        Some(Ok(Some(content))) => Json(json!({ "content": content, "path": GOALS_DISPLAY_PATH })),
        Some(Ok(None)) | None => Json(json!({ "content": null, "error": "Goals file not found" })),
        Some(Err(e)) => Json(json!({ "content": null, "error": e.to_string() })),
    }
}

pub async fn agents(State(state): State<AppState>) -> Json<Value> {
    let config = state.config.clone();
    let (sessions, platform) = tokio::join!(
        session_values(&state),
        blocking(move || config.load_platform_config())
    );
    let sessions: Vec<Session> = parse_items(&sessions);

    let agents = views::build_agent_roster(platform.flatten().as_ref(), &sessions);
    Json(json!({ "agents": agents }))
}

pub async fn config(State(state): State<AppState>) -> ApiResult {
    let config = state.config.clone();
    match blocking(move || config.load_platform_config()).await.flatten() {
        Some(platform) => to_json(&platform.sanitized()),
        None => Ok(Json(json!({ "error": "Could not read OpenClaw config" }))),
    }
}

pub async fn channels(State(state): State<AppState>) -> Json<Value> {
    Json(cli_json(&state, "channels status", |c| c.channels(), json!({ "channels": {} })).await)
}

pub async fn gateway_health(State(state): State<AppState>) -> Json<Value> {
    Json(
        cli_json(
            &state,
            "gateway health",
            |c| c.gateway_health(),
            json!({ "ok": false, "error": "Failed to fetch gateway health" }),
        )
        .await,
    )
}

pub async fn gateway_status(State(state): State<AppState>) -> Json<Value> {
    Json(
        cli_json(
            &state,
            "gateway status",
            |c| c.gateway_status(),
            json!({ "error": "Failed to fetch gateway status" }),
        )
        .await,
    )
}

/// Key metadata as returned by the billing API, tagged with `connected`.
pub async fn openrouter_key(State(state): State<AppState>) -> Json<Value> {
    let config = state.config.clone();
    let api = state.billing.clone();
    let result = blocking(move || {
        let key = billing::resolve_api_key(&config)?;
        Some(billing::fetch_key_info(api.as_ref(), Some(&key)))
    })
    .await
    .flatten();

    match result {
        None => Json(json!({ "connected": false, "error": billing::NO_KEY_ERROR })),
        Some(Some(Value::Object(body))) => {
            let mut tagged = Map::new();
            tagged.insert("connected".to_string(), Value::Bool(true));
            tagged.extend(body);
            Json(Value::Object(tagged))
        }
        Some(_) => Json(json!({ "connected": false, "error": billing::UNAVAILABLE_ERROR })),
    }
}

pub async fn openrouter_usage(State(state): State<AppState>) -> ApiResult {
    to_json(&billing_usage(&state).await)
}

pub async fn emergency_stop(State(state): State<AppState>) -> Json<Value> {
    let killed = cli_raw(&state, |c| c.kill_all_sessions()).await.is_some();
    if killed {
        tracing::warn!("emergency stop: all sessions killed");
        Json(json!({ "success": true, "message": "All sessions killed" }))
    } else {
        tracing::error!("emergency stop failed");
        Json(json!({ "success": false, "error": "Failed to execute emergency stop" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_blank() {
        assert!(required(&None, "q").is_err());
        assert!(required(&Some("   ".to_string()), "q").is_err());
        assert_eq!(required(&Some(" x ".to_string()), "q").unwrap(), "x");
    }

    #[test]
    fn test_job_id_rejects_flags() {
        assert!(job_id(&Some("--all".to_string())).is_err());
        assert_eq!(job_id(&Some("daily".to_string())).unwrap(), "daily");
    }

    #[test]
    fn test_limit_or_default() {
        assert_eq!(limit_or(&None, 10), 10);
        assert_eq!(limit_or(&Some("abc".to_string()), 10), 10);
        assert_eq!(limit_or(&Some("0".to_string()), 10), 10);
        assert_eq!(limit_or(&Some("5".to_string()), 10), 5);
    }
}
