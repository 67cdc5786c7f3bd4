//! Typed views over the JSON documents the OpenClaw CLI emits.
//!
//! The proxy passes upstream documents through to the UI verbatim; these
//! types exist only for the derived views, which need a handful of fields
//! with explicit defaults. A field of the wrong type reads as its default,
//! and so does a list element that is not an object at all.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Age under which a session counts as active.
pub const ACTIVE_SESSION_MS: i64 = 10 * 60 * 1000;

/// One entry of `openclaw sessions list --json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Session {
    /// Colon-delimited key, e.g. `agent:jerry:cron:<job-id>`.
    #[serde(deserialize_with = "lenient")]
    pub key: String,
    #[serde(deserialize_with = "lenient")]
    pub session_id: Option<String>,
    /// Last update, in milliseconds since the epoch.
    #[serde(deserialize_with = "lenient")]
    pub updated_at: Option<i64>,
    /// Milliseconds since the last update, as computed by the CLI.
    #[serde(deserialize_with = "lenient")]
    pub age_ms: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub total_tokens: Option<u64>,
}

/// What kind of session a key describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCategory {
    Main,
    Subagent,
    Cron,
    Other(String),
}

/// Parsed form of a session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    /// Second segment, or `"unknown"` when absent.
    pub agent_id: String,
    pub category: SessionCategory,
}

impl SessionKey {
    /// Parse `agent:<agentId>[:<category>[:...]]`.
    ///
    /// A missing third segment means the agent's main session.
    pub fn parse(key: &str) -> Self {
        let mut parts = key.split(':');
        let _ = parts.next();
        let agent_id = parts
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
            .to_string();
        let category = match parts.next() {
            None | Some("") | Some("main") => SessionCategory::Main,
            Some("subagent") => SessionCategory::Subagent,
            Some("cron") => SessionCategory::Cron,
            Some(other) => SessionCategory::Other(other.to_string()),
        };
        Self { agent_id, category }
    }
}

impl Session {
    pub fn parsed_key(&self) -> SessionKey {
        SessionKey::parse(&self.key)
    }

    /// Whether the session belongs to `agent_id` (second key segment).
    pub fn belongs_to(&self, agent_id: &str) -> bool {
        self.key.split(':').nth(1) == Some(agent_id)
    }

    /// Age is known and within `[0, window_ms)`.
    pub fn age_within(&self, window_ms: i64) -> bool {
        self.age_ms.is_some_and(|age| (0..window_ms).contains(&age))
    }

    pub fn is_active(&self) -> bool {
        self.age_within(ACTIVE_SESSION_MS)
    }

    pub fn tokens(&self) -> u64 {
        self.total_tokens.unwrap_or(0)
    }

    /// When the session last moved: `updatedAt`, else `now - ageMs`.
    pub fn event_time_ms(&self, now_ms: i64) -> Option<i64> {
        self.updated_at
            .or_else(|| self.age_ms.and_then(|age| now_ms.checked_sub(age)))
    }
}

/// One entry of `openclaw cron list --json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CronJob {
    #[serde(deserialize_with = "lenient")]
    pub id: String,
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub agent_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub schedule: Option<CronSchedule>,
    #[serde(deserialize_with = "lenient")]
    pub state: Option<CronJobState>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CronSchedule {
    #[serde(deserialize_with = "lenient")]
    pub expr: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CronJobState {
    #[serde(deserialize_with = "lenient")]
    pub last_run_at_ms: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub next_run_at_ms: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub last_result: Option<String>,
}

impl CronJob {
    /// A job without an explicit `enabled` flag counts as enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled != Some(false)
    }

    /// Last run timestamp; zero is treated as never run.
    pub fn last_run_at_ms(&self) -> Option<i64> {
        self.state
            .as_ref()
            .and_then(|s| s.last_run_at_ms)
            .filter(|&ms| ms > 0)
    }

    /// Next run timestamp; zero is treated as unscheduled.
    pub fn next_run_at_ms(&self) -> Option<i64> {
        self.state
            .as_ref()
            .and_then(|s| s.next_run_at_ms)
            .filter(|&ms| ms > 0)
    }

    pub fn last_result(&self) -> Option<&str> {
        self.state.as_ref().and_then(|s| s.last_result.as_deref())
    }

    pub fn schedule_expr(&self) -> Option<&str> {
        self.schedule.as_ref().and_then(|s| s.expr.as_deref())
    }

    pub fn agent_or_default(&self) -> &str {
        self.agent_id.as_deref().unwrap_or("default")
    }
}

/// Field deserializer that reads `null` or a mistyped value as the default.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: for<'a> Deserialize<'a> + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Convert raw list elements into `T`, one for one. Elements that are not
/// objects become `T::default()`, so counts always match the raw list.
pub fn parse_items<T: for<'de> Deserialize<'de> + Default>(items: &[Value]) -> Vec<T> {
    items
        .iter()
        .map(|item| serde_json::from_value(item.clone()).unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_key_main_when_no_third_segment() {
        let key = SessionKey::parse("agent:jerry");
        assert_eq!(key.agent_id, "jerry");
        assert_eq!(key.category, SessionCategory::Main);
    }

    #[test]
    fn test_session_key_categories() {
        assert_eq!(
            SessionKey::parse("agent:jerry:main").category,
            SessionCategory::Main
        );
        assert_eq!(
            SessionKey::parse("agent:jerry:cron:abc").category,
            SessionCategory::Cron
        );
        assert_eq!(
            SessionKey::parse("agent:scout:subagent:x1").category,
            SessionCategory::Subagent
        );
        assert_eq!(
            SessionKey::parse("agent:scout:telegram:dm").category,
            SessionCategory::Other("telegram".to_string())
        );
    }

    #[test]
    fn test_session_key_unknown_agent() {
        let key = SessionKey::parse("");
        assert_eq!(key.agent_id, "unknown");
        assert_eq!(key.category, SessionCategory::Main);
    }

    #[test]
    fn test_session_deserialize_partial() {
        let session: Session = serde_json::from_value(json!({
            "key": "agent:jerry:main",
            "updatedAt": 1_700_000_000_000i64,
            "totalTokens": 1200,
            "extra": "ignored"
        }))
        .unwrap();
        assert_eq!(session.updated_at, Some(1_700_000_000_000));
        assert_eq!(session.tokens(), 1200);
        assert!(session.age_ms.is_none());
        assert!(!session.is_active());
    }

    #[test]
    fn test_age_window_is_half_open() {
        let day = 24 * 60 * 60 * 1000;
        let at = |age| Session {
            age_ms: Some(age),
            ..Default::default()
        };
        assert!(at(0).age_within(day));
        assert!(at(day - 1).age_within(day));
        assert!(!at(day).age_within(day));
        assert!(!at(-5).age_within(day));
    }

    #[test]
    fn test_event_time_prefers_updated_at() {
        let session = Session {
            updated_at: Some(500),
            age_ms: Some(100),
            ..Default::default()
        };
        assert_eq!(session.event_time_ms(1_000), Some(500));

        let session = Session {
            age_ms: Some(100),
            ..Default::default()
        };
        assert_eq!(session.event_time_ms(1_000), Some(900));

        assert_eq!(Session::default().event_time_ms(1_000), None);
    }

    #[test]
    fn test_belongs_to() {
        let session = Session {
            key: "agent:jerry:cron:1".to_string(),
            ..Default::default()
        };
        assert!(session.belongs_to("jerry"));
        assert!(!session.belongs_to("scout"));
    }

    #[test]
    fn test_cron_job_accessors() {
        let job: CronJob = serde_json::from_value(json!({
            "id": "daily",
            "name": "Daily digest",
            "schedule": {"kind": "cron", "expr": "0 7 * * *"},
            "state": {"lastRunAtMs": 10, "nextRunAtMs": 0, "lastResult": "error"}
        }))
        .unwrap();
        assert!(job.is_enabled());
        assert_eq!(job.last_run_at_ms(), Some(10));
        assert_eq!(job.next_run_at_ms(), None);
        assert_eq!(job.last_result(), Some("error"));
        assert_eq!(job.schedule_expr(), Some("0 7 * * *"));
        assert_eq!(job.agent_or_default(), "default");
    }

    #[test]
    fn test_disabled_job() {
        let job: CronJob = serde_json::from_value(json!({"id": "x", "enabled": false})).unwrap();
        assert!(!job.is_enabled());
    }

    #[test]
    fn test_parse_items_keeps_every_element() {
        let items = vec![
            json!({"id": "a", "name": "A"}),
            json!("not a job"),
            json!({"id": 5}),
            json!({"id": "b"}),
        ];
        let jobs: Vec<CronJob> = parse_items(&items);
        let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "", "", "b"]);
    }

    #[test]
    fn test_mistyped_fields_read_as_defaults() {
        let job: CronJob = serde_json::from_value(json!({
            "id": "a",
            "name": null,
            "enabled": "yes",
            "state": {"lastRunAtMs": "soon", "nextRunAtMs": 20}
        }))
        .unwrap();
        assert_eq!(job.id, "a");
        assert_eq!(job.name, "");
        assert!(job.is_enabled());
        assert_eq!(job.last_run_at_ms(), None);
        assert_eq!(job.next_run_at_ms(), Some(20));

        let session: Session = serde_json::from_value(json!({
            "key": null,
            "model": 7,
            "totalTokens": 12
        }))
        .unwrap();
        assert_eq!(session.key, "");
        assert_eq!(session.model, None);
        assert_eq!(session.tokens(), 12);
    }

    #[test]
    fn test_event_time_survives_extreme_age() {
        let session = Session {
            age_ms: Some(i64::MIN),
            ..Default::default()
        };
        assert_eq!(session.event_time_ms(1_000), None);

        let session = Session {
            age_ms: Some(i64::MAX),
            ..Default::default()
        };
        assert_eq!(session.event_time_ms(-2), None);
    }
}
