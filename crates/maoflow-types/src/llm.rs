//! Upstream LLM request/response types for MaoFlow.
//!
//! These types model the data shapes for chat-completion provider interactions:
//! completion requests, raw streaming chunks, usage tracking, and error handling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Function,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Function => write!(f, "function"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "function" => Ok(MessageRole::Function),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single `{role, content}` entry in the history sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request to an upstream chat-completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: bool,
}

/// Response from an upstream provider for a non-streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub content: String,
    /// Reasoning text, for providers that return it separately.
    pub reasoning: Option<String>,
    pub usage: Option<Usage>,
}

/// Provider-reported token usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// One increment of an upstream completion stream.
///
/// A well-formed chunk carries at most one text field. Chunks that carry
/// none produce no channel event: heartbeats, the trailing usage-only chunk,
/// and the empty chunk a provider yields once the upstream accepts the
/// request. `action` and `observation` are only populated by providers
/// that expose those segments as distinct protocol fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawChunk {
    pub reasoning: Option<String>,
    pub content: Option<String>,
    pub action: Option<String>,
    pub observation: Option<String>,
    pub usage: Option<Usage>,
}

impl RawChunk {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn usage(usage: Usage) -> Self {
        Self {
            usage: Some(usage),
            ..Default::default()
        }
    }
}

/// Errors from upstream provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    /// Connection failure, timeout, or a transient 5xx before any data arrived.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Application-level refusal (bad key, unknown model, rate limit).
    #[error("upstream rejected request (status {status:?}): {message}")]
    UpstreamRejected { status: Option<u16>, message: String },

    /// The stream broke or produced garbage after it had started.
    #[error("stream failed mid-way: {0}")]
    MidStreamFailure(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl LlmError {
    /// Only transient connection faults are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::UpstreamUnavailable(_))
    }
}
