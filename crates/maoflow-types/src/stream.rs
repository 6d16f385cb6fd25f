//! Streaming channel and wire-frame types.
//!
//! A chat turn's upstream output is split into a fixed set of channels.
//! Each increment becomes a [`ChannelDelta`], the aggregator turns it into a
//! [`StreamEvent`] carrying the cumulative channel text, and the transport
//! layer serializes it as an [`SseFrame`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Logical content channel of an assistant response.
///
/// The declaration order is the persistence priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Think,
    Message,
    Action,
    Observation,
}

impl ChannelKind {
    /// All channels in priority order.
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Think,
        ChannelKind::Message,
        ChannelKind::Action,
        ChannelKind::Observation,
    ];

    /// Zero-based priority, used as the content block `order`.
    pub fn priority(self) -> u32 {
        match self {
            ChannelKind::Think => 0,
            ChannelKind::Message => 1,
            ChannelKind::Action => 2,
            ChannelKind::Observation => 3,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Think => write!(f, "think"),
            ChannelKind::Message => write!(f, "message"),
            ChannelKind::Action => write!(f, "action"),
            ChannelKind::Observation => write!(f, "observation"),
        }
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "think" => Ok(ChannelKind::Think),
            "message" => Ok(ChannelKind::Message),
            "action" => Ok(ChannelKind::Action),
            "observation" => Ok(ChannelKind::Observation),
            other => Err(format!("invalid channel kind: '{other}'")),
        }
    }
}

/// A single classified increment produced by the demultiplexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDelta {
    pub kind: ChannelKind,
    pub text: String,
    /// True when this delta switches the live display to a different channel.
    pub starts_segment: bool,
}

/// A forwarded increment, carrying both the delta and the cumulative text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: ChannelKind,
    pub delta: String,
    pub content: String,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
}

/// `type` field of a wire frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    Think,
    Message,
    Action,
    Observation,
    Error,
    Done,
}

impl From<ChannelKind> for FrameType {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Think => FrameType::Think,
            ChannelKind::Message => FrameType::Message,
            ChannelKind::Action => FrameType::Action,
            ChannelKind::Observation => FrameType::Observation,
        }
    }
}

/// JSON payload of one server-sent event.
///
/// Serialized as `{"type": ..., "content": ..., "conversation_id": ..., "message_id": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseFrame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    pub content: String,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
}

impl SseFrame {
    pub fn error(conversation_id: Uuid, message_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            frame_type: FrameType::Error,
            content: message.into(),
            conversation_id,
            message_id,
        }
    }

    pub fn done(conversation_id: Uuid, message_id: Uuid) -> Self {
        Self {
            frame_type: FrameType::Done,
            content: String::new(),
            conversation_id,
            message_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.frame_type == FrameType::Done
    }

    pub fn to_json(&self) -> String {
        // Only strings, uuids and unit enums: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<StreamEvent> for SseFrame {
    fn from(event: StreamEvent) -> Self {
        Self {
            frame_type: event.kind.into(),
            content: event.content,
            conversation_id: event.conversation_id,
            message_id: event.message_id,
        }
    }
}
