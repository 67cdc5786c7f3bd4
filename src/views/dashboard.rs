//! The aggregate document behind the dashboard's first paint.

use serde::Serialize;
use serde_json::Value;

use crate::billing::BillingUsage;
use crate::config::{ModelEntry, PlatformConfig};

/// Number of history snapshots included for the charts.
pub const DASHBOARD_HISTORY_DAYS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub models: Vec<ModelEntry>,
    pub default_model: String,
}

impl ConfigSummary {
    pub fn from_platform(config: Option<&PlatformConfig>) -> Self {
        match config {
            Some(c) => Self {
                models: c.models(),
                default_model: c.default_model(),
            },
            None => Self {
                models: Vec::new(),
                default_model: "unknown".to_string(),
            },
        }
    }
}

/// Sessions and jobs are passed through as the CLI emitted them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub sessions: Vec<Value>,
    pub cron_jobs: Vec<Value>,
    pub openrouter_usage: BillingUsage,
    pub history_snapshots: Vec<Value>,
    pub config: ConfigSummary,
}

pub fn build_dashboard(
    sessions: Vec<Value>,
    cron_jobs: Vec<Value>,
    openrouter_usage: BillingUsage,
    history_snapshots: Vec<Value>,
    config: Option<&PlatformConfig>,
) -> Dashboard {
    Dashboard {
        sessions,
        cron_jobs,
        openrouter_usage,
        history_snapshots,
        config: ConfigSummary::from_platform(config),
    }
}
