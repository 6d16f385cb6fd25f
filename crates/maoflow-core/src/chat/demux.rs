//! Classifies raw upstream increments into channel deltas.

use maoflow_types::llm::RawChunk;
use maoflow_types::stream::{ChannelDelta, ChannelKind};

/// Maps each [`RawChunk`] to at most one [`ChannelDelta`].
///
/// Precedence per chunk: reasoning, then content, then action, then
/// observation. Empty fragments count as absent. The only state carried
/// across chunks is the channel of the previous delta, which decides
/// `starts_segment`.
#[derive(Debug, Default)]
pub struct Demultiplexer {
    current: Option<ChannelKind>,
}

impl Demultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel of the most recent delta, if any.
    pub fn current(&self) -> Option<ChannelKind> {
        self.current
    }

    pub fn classify(&mut self, chunk: RawChunk) -> Option<ChannelDelta> {
        let RawChunk {
            reasoning,
            content,
            action,
            observation,
            ..
        } = chunk;

        let (kind, text) = [
            (ChannelKind::Think, reasoning),
            (ChannelKind::Message, content),
            (ChannelKind::Action, action),
            (ChannelKind::Observation, observation),
        ]
        .into_iter()
        .find_map(|(kind, text)| text.filter(|t| !t.is_empty()).map(|t| (kind, t)))?;

        let starts_segment = self.current != Some(kind);
        self.current = Some(kind);

        Some(ChannelDelta {
            kind,
            text,
            starts_segment,
        })
    }
}
