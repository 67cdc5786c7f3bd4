//! OpenRouter billing lookups.
//!
//! The billing API is queried with `GET <base>/auth/key` and a bearer
//! token. Like the CLI, the HTTP body goes through the normalization
//! layer; the typed structs below then read it with explicit defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::DashboardConfig;
use crate::normalize::normalize_detailed;

/// User-Agent sent to the billing API.
const USER_AGENT: &str = concat!("jerry-dash/", env!("CARGO_PKG_VERSION"));

/// Raw access to the billing API.
pub trait BillingApi: Send + Sync {
    /// Body of the key-info response, or `None` when the call failed.
    fn key_info(&self, api_key: &str) -> Option<String>;
}

/// [`BillingApi`] backed by the OpenRouter HTTP API.
#[derive(Debug, Clone)]
pub struct OpenRouterApi {
    base_url: String,
    timeout: Duration,
}

impl OpenRouterApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.billing_url.clone(), config.timeouts.billing)
    }
}

impl BillingApi for OpenRouterApi {
    fn key_info(&self, api_key: &str) -> Option<String> {
        let url = format!("{}/auth/key", self.base_url);

        let response = ureq::get(&url)
            .set("Authorization", &format!("Bearer {}", api_key))
            .set("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .call();

        match response {
            Ok(resp) => match resp.into_string() {
                Ok(body) => Some(body),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "billing response body unreadable");
                    None
                }
            },
            Err(ureq::Error::Status(code, _)) => {
                tracing::warn!(url = %url, status = code, "billing API returned an error status");
                None
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "billing API unreachable");
                None
            }
        }
    }
}

/// Response of `GET /auth/key`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeyInfo {
    pub data: KeyData,
}

/// Usage figures of one API key, all in USD.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeyData {
    pub usage: Option<f64>,
    pub usage_daily: Option<f64>,
    pub usage_weekly: Option<f64>,
    pub usage_monthly: Option<f64>,
    pub limit: Option<f64>,
    pub limit_remaining: Option<f64>,
}

/// Usage figures as served to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageFigures {
    pub usage: f64,
    pub usage_daily: f64,
    pub usage_weekly: f64,
    pub usage_monthly: f64,
    pub limit: Option<f64>,
    pub limit_remaining: Option<f64>,
}

impl From<&KeyData> for UsageFigures {
    fn from(data: &KeyData) -> Self {
        Self {
            usage: data.usage.unwrap_or(0.0),
            usage_daily: data.usage_daily.unwrap_or(0.0),
            usage_weekly: data.usage_weekly.unwrap_or(0.0),
            usage_monthly: data.usage_monthly.unwrap_or(0.0),
            limit: data.limit,
            limit_remaining: data.limit_remaining,
        }
    }
}

/// Connection state plus figures, when connected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingUsage {
    pub connected: bool,
    #[serde(flatten)]
    pub figures: Option<UsageFigures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BillingUsage {
    pub fn disconnected(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            figures: None,
            error: Some(error.into()),
        }
    }
}

/// Today's spend, as shown on the morning brief.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostToday {
    pub daily: f64,
    pub weekly: f64,
    pub monthly: f64,
    pub limit: Option<f64>,
    pub limit_remaining: Option<f64>,
}

impl From<&UsageFigures> for CostToday {
    fn from(f: &UsageFigures) -> Self {
        Self {
            daily: f.usage_daily,
            weekly: f.usage_weekly,
            monthly: f.usage_monthly,
            limit: f.limit,
            limit_remaining: f.limit_remaining,
        }
    }
}

pub const NO_KEY_ERROR: &str = "No OpenRouter API key configured";
pub const UNAVAILABLE_ERROR: &str = "Billing API unavailable";

/// Resolve the billing key: explicit override first, then the platform config.
pub fn resolve_api_key(config: &DashboardConfig) -> Option<String> {
    if let Some(key) = &config.billing_key_override {
        return Some(key.clone());
    }
    config
        .load_platform_config()
        .and_then(|c| c.openrouter_api_key().map(str::to_string))
}

/// Normalized key-info body, or `None` if there is no key or the call failed.
pub fn fetch_key_info(api: &dyn BillingApi, api_key: Option<&str>) -> Option<Value> {
    let key = api_key?;
    let normalized = normalize_detailed(api.key_info(key).as_deref(), Value::Null);
    if let Some(failure) = &normalized.failure {
        tracing::warn!(reason = %failure, "billing payload unusable");
        return None;
    }
    match normalized.value {
        Value::Object(_) => Some(normalized.value),
        _ => None,
    }
}

/// Fetch and shape usage figures. Never fails; failures set `connected: false`.
pub fn fetch_usage(api: &dyn BillingApi, api_key: Option<&str>) -> BillingUsage {
    if api_key.is_none() {
        return BillingUsage::disconnected(NO_KEY_ERROR);
    }
    match fetch_key_info(api, api_key) {
        Some(body) => {
            let info: KeyInfo = serde_json::from_value(body).unwrap_or_default();
            BillingUsage {
                connected: true,
                figures: Some(UsageFigures::from(&info.data)),
                error: None,
            }
        }
        None => BillingUsage::disconnected(UNAVAILABLE_ERROR),
    }
}
