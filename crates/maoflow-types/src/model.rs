//! LLM model configuration types.
//!
//! An [`LlmModel`] row binds a conversation to an upstream endpoint and its
//! credentials. The chat pipeline only ever reads a [`ModelConfig`] snapshot
//! taken when a turn starts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Wire protocol spoken by the upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    #[default]
    OpenaiCompatible,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::OpenaiCompatible => write!(f, "openai_compatible"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai_compatible" | "openai" => Ok(ProviderType::OpenaiCompatible),
            other => Err(format!("invalid provider type: '{other}'")),
        }
    }
}

/// A persisted model configuration.
///
/// `api_key` is never serialized and is redacted from `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmModel {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub provider: ProviderType,
    pub model_name: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub base_url: Option<String>,
    pub default_temperature: f64,
    pub default_max_tokens: Option<u32>,
    pub default_system_prompt: Option<String>,
    pub is_active: bool,
    pub priority: i32,
    pub total_tokens_used: u64,
    pub daily_token_limit: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for LlmModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmModel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("is_active", &self.is_active)
            .field("priority", &self.priority)
            .field("total_tokens_used", &self.total_tokens_used)
            .finish_non_exhaustive()
    }
}

impl LlmModel {
    /// Snapshot the fields a chat turn needs.
    ///
    /// `fallback_base_url` is used when the row has no endpoint of its own.
    pub fn snapshot(&self, fallback_base_url: &str) -> ModelConfig {
        ModelConfig {
            model_id: self.id,
            model_name: self.model_name.clone(),
            base_url: self
                .base_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| fallback_base_url.to_string()),
            api_key: self.api_key.clone(),
            default_temperature: self.default_temperature,
            default_max_tokens: self.default_max_tokens,
        }
    }
}

/// Immutable per-turn copy of a model's endpoint and credentials.
#[derive(Clone)]
pub struct ModelConfig {
    pub model_id: Uuid,
    pub model_name: String,
    pub base_url: String,
    pub api_key: String,
    pub default_temperature: f64,
    pub default_max_tokens: Option<u32>,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("model_id", &self.model_id)
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Request body for creating a model.
#[derive(Clone, Deserialize)]
pub struct NewModel {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub provider: ProviderType,
    pub model_name: String,
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default)]
    pub default_max_tokens: Option<u32>,
    #[serde(default)]
    pub default_system_prompt: Option<String>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub daily_token_limit: Option<u64>,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_is_active() -> bool {
    true
}

/// Partial update of a model. Absent fields are left unchanged.
#[derive(Clone, Default, Deserialize)]
pub struct ModelPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_temperature: Option<f64>,
    pub default_max_tokens: Option<u32>,
    pub default_system_prompt: Option<String>,
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
    pub daily_token_limit: Option<u64>,
}

impl ModelPatch {
    pub fn apply(self, model: &mut LlmModel) {
        if let Some(v) = self.name {
            model.name = v;
        }
        if let Some(v) = self.description {
            model.description = Some(v);
        }
        if let Some(v) = self.model_name {
            model.model_name = v;
        }
        if let Some(v) = self.api_key {
            model.api_key = v;
        }
        if let Some(v) = self.base_url {
            model.base_url = Some(v);
        }
        if let Some(v) = self.default_temperature {
            model.default_temperature = v;
        }
        if let Some(v) = self.default_max_tokens {
            model.default_max_tokens = Some(v);
        }
        if let Some(v) = self.default_system_prompt {
            model.default_system_prompt = Some(v);
        }
        if let Some(v) = self.is_active {
            model.is_active = v;
        }
        if let Some(v) = self.priority {
            model.priority = v;
        }
        if let Some(v) = self.daily_token_limit {
            model.daily_token_limit = Some(v);
        }
    }
}
