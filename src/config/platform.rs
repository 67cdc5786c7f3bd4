//! Typed view of the platform's `openclaw.json`.
//!
//! Only the fields the dashboard reads are modelled. Every field defaults,
//! and entries that do not match the expected shape are skipped rather
//! than failing the whole document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Key in the `agents` map that holds shared defaults rather than an agent.
pub const DEFAULTS_AGENT_KEY: &str = "defaults";

/// Root of `openclaw.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub models: ModelsSection,
    /// Agent id to agent settings, plus the `defaults` entry.
    pub agents: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelsSection {
    pub providers: Providers,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Providers {
    pub openrouter: OpenRouterProvider,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpenRouterProvider {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    pub models: Vec<Value>,
}

/// One model offered by the provider, as exposed to the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,
}

/// Settings of one agent (or of the `defaults` entry).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentEntry {
    pub model: AgentModel,
    pub workspace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentModel {
    pub primary: Option<String>,
    pub fallbacks: Vec<String>,
}

/// The subset of platform config the UI may see. Never carries secrets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedConfig {
    pub models: Vec<ModelEntry>,
    pub default_model: String,
    pub fallbacks: Vec<String>,
}

impl PlatformConfig {
    /// Read and parse the config file. Missing or unparseable files yield `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "platform config not readable");
                return None;
            }
        };
        match Self::parse(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "platform config is not valid JSON");
                None
            }
        }
    }

    pub fn parse(content: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// The OpenRouter API key, if configured and non-blank.
    pub fn openrouter_api_key(&self) -> Option<&str> {
        self.models
            .providers
            .openrouter
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }

    /// Provider models that have the expected object shape.
    pub fn models(&self) -> Vec<ModelEntry> {
        self.models
            .providers
            .openrouter
            .models
            .iter()
            .filter_map(|m| serde_json::from_value(m.clone()).ok())
            .collect()
    }

    /// The `defaults` agent entry.
    pub fn agent_defaults(&self) -> AgentEntry {
        self.agents
            .get(DEFAULTS_AGENT_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Every configured agent except `defaults`, ordered by agent id.
    pub fn agent_entries(&self) -> Vec<(String, AgentEntry)> {
        self.agents
            .iter()
            .filter(|(id, _)| id.as_str() != DEFAULTS_AGENT_KEY)
            .map(|(id, v)| {
                let entry = serde_json::from_value(v.clone()).unwrap_or_default();
                (id.clone(), entry)
            })
            .collect()
    }

    /// The primary model of the defaults entry, or `"unknown"`.
    pub fn default_model(&self) -> String {
        self.agent_defaults()
            .model
            .primary
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn sanitized(&self) -> SanitizedConfig {
        SanitizedConfig {
            models: self.models(),
            default_model: self.default_model(),
            fallbacks: self.agent_defaults().model.fallbacks,
        }
    }
}
