//! Conversation, message, and content block types for MaoFlow.
//!
//! A conversation is the aggregate root: it owns an ordered list of messages,
//! and each assistant message owns up to one content block per channel kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;
use crate::stream::ChannelKind;

/// Lifecycle status of a conversation.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (status IN ('active', 'archived', 'deleted'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    #[default]
    Active,
    Archived,
    Deleted,
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationStatus::Active => write!(f, "active"),
            ConversationStatus::Archived => write!(f, "archived"),
            ConversationStatus::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ConversationStatus::Active),
            "archived" => Ok(ConversationStatus::Archived),
            "deleted" => Ok(ConversationStatus::Deleted),
            other => Err(format!("invalid conversation status: '{other}'")),
        }
    }
}

/// A conversation bound to one model configuration.
///
/// `message_count` and `total_tokens` only ever grow, and are changed
/// exclusively by the finalize step of a chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub model_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub status: ConversationStatus,
    pub message_count: u32,
    pub total_tokens: u64,
    pub last_message_at: Option<DateTime<Utc>>,
    pub meta_info: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewConversation {
    pub user_id: Uuid,
    pub model_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub meta_info: Option<serde_json::Value>,
}

/// Partial update of a conversation. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub status: Option<ConversationStatus>,
    pub meta_info: Option<serde_json::Value>,
}

/// Media type of a message. Only text is produced by the chat pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Audio,
    Video,
    File,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Text => write!(f, "text"),
            MessageType::Image => write!(f, "image"),
            MessageType::Audio => write!(f, "audio"),
            MessageType::Video => write!(f, "video"),
            MessageType::File => write!(f, "file"),
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "audio" => Ok(MessageType::Audio),
            "video" => Ok(MessageType::Video),
            "file" => Ok(MessageType::File),
            other => Err(format!("invalid message type: '{other}'")),
        }
    }
}

/// A single message within a conversation.
///
/// For assistant messages, `content` is empty until the turn is finalized,
/// after which it equals the turn's `message` channel text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub role: MessageRole,
    pub message_type: MessageType,
    pub content: String,
    pub tokens: u32,
    /// Seconds spent producing this message (assistant messages only).
    pub processing_time: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Build a fresh text message with zeroed stats.
    pub fn text(
        conversation_id: Uuid,
        user_id: Uuid,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            user_id,
            role,
            message_type: MessageType::Text,
            content: content.into(),
            tokens: 0,
            processing_time: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One persisted content block of an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageItem {
    pub id: Uuid,
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub kind: ChannelKind,
    pub content: String,
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

/// Body of a chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    /// Overrides the model's default temperature for this turn.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// `false` asks upstream for a single response; frames are still streamed.
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            temperature: None,
            stream: true,
        }
    }
}

/// Everything the finalize step writes for one turn, applied atomically.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub conversation_id: Uuid,
    pub model_id: Uuid,
    pub assistant_message_id: Uuid,
    /// Non-empty channel buffers in priority order.
    pub blocks: Vec<(ChannelKind, String)>,
    /// New assistant content; `None` leaves the placeholder as is.
    pub content: Option<String>,
    pub assistant_tokens: u32,
    pub user_tokens: u32,
    pub processing_time: f64,
    /// Messages added by this turn (user + assistant).
    pub message_delta: u32,
    pub finished_at: DateTime<Utc>,
}

impl TurnRecord {
    pub fn token_delta(&self) -> u64 {
        u64::from(self.assistant_tokens) + u64::from(self.user_tokens)
    }
}
