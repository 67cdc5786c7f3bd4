//! Agent roster joined with live session counts.

use serde::Serialize;

use crate::config::PlatformConfig;
use crate::models::Session;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub agent_id: String,
    pub model: String,
    pub workspace: Option<String>,
    pub session_count: usize,
    pub active_sessions: usize,
    pub total_tokens: u64,
}

/// One summary per configured agent, in agent id order.
///
/// The model falls back to the defaults entry, then to `"unknown"`.
pub fn build_agent_roster(config: Option<&PlatformConfig>, sessions: &[Session]) -> Vec<AgentSummary> {
    let Some(config) = config else {
        return Vec::new();
    };
    let default_model = config.agent_defaults().model.primary;

    config
        .agent_entries()
        .into_iter()
        .map(|(agent_id, entry)| {
            let own: Vec<&Session> = sessions.iter().filter(|s| s.belongs_to(&agent_id)).collect();
            AgentSummary {
                model: entry
                    .model
                    .primary
                    .or_else(|| default_model.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                workspace: entry.workspace,
                session_count: own.len(),
                active_sessions: own.iter().filter(|s| s.is_active()).count(),
                total_tokens: own.iter().map(|s| s.tokens()).sum(),
                agent_id,
            }
        })
        .collect()
}
