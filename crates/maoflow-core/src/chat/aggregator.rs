//! Per-channel accumulation for one chat turn.

use maoflow_types::stream::{ChannelDelta, ChannelKind, StreamEvent};
use uuid::Uuid;

/// One growing buffer per channel kind, owned by a single turn.
///
/// Buffers are keyed by kind, not by position: switching back and forth
/// between channels keeps appending to the same buffer.
#[derive(Debug)]
pub struct ChannelAggregator {
    conversation_id: Uuid,
    message_id: Uuid,
    think: String,
    message: String,
    action: String,
    observation: String,
}

impl ChannelAggregator {
    pub fn new(conversation_id: Uuid, message_id: Uuid) -> Self {
        Self {
            conversation_id,
            message_id,
            think: String::new(),
            message: String::new(),
            action: String::new(),
            observation: String::new(),
        }
    }

    pub fn buffer(&self, kind: ChannelKind) -> &str {
        match kind {
            ChannelKind::Think => &self.think,
            ChannelKind::Message => &self.message,
            ChannelKind::Action => &self.action,
            ChannelKind::Observation => &self.observation,
        }
    }

    fn buffer_mut(&mut self, kind: ChannelKind) -> &mut String {
        match kind {
            ChannelKind::Think => &mut self.think,
            ChannelKind::Message => &mut self.message,
            ChannelKind::Action => &mut self.action,
            ChannelKind::Observation => &mut self.observation,
        }
    }

    /// Append a delta and return the event to forward, which carries the
    /// channel's cumulative text.
    pub fn apply(&mut self, delta: ChannelDelta) -> StreamEvent {
        let buffer = self.buffer_mut(delta.kind);
        buffer.push_str(&delta.text);
        let content = buffer.clone();

        StreamEvent {
            kind: delta.kind,
            delta: delta.text,
            content,
            conversation_id: self.conversation_id,
            message_id: self.message_id,
        }
    }

    /// Byte length of every buffer, in priority order.
    pub fn byte_counts(&self) -> [(ChannelKind, usize); 4] {
        ChannelKind::ALL.map(|kind| (kind, self.buffer(kind).len()))
    }

    /// Drain into the non-empty buffers, in priority order.
    pub fn finish(self) -> Vec<(ChannelKind, String)> {
        let Self {
            think,
            message,
            action,
            observation,
            ..
        } = self;

        [
            (ChannelKind::Think, think),
            (ChannelKind::Message, message),
            (ChannelKind::Action, action),
            (ChannelKind::Observation, observation),
        ]
        .into_iter()
        .filter(|(_, text)| !text.is_empty())
        .collect()
    }
}
