//! Turn orchestrator: drives one chat turn from upstream connect to the
//! terminal `done` frame.
//!
//! The orchestrator runs as its own task and talks to the HTTP layer through
//! a bounded channel of capacity 1, so an upstream chunk is only pulled once
//! the previous frame has been handed to the client. Whatever happens
//! upstream or on the client side, the turn is finalized exactly once and
//! the frame sequence ends with exactly one `done`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{StreamExt, stream};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use maoflow_types::chat::TurnRecord;
use maoflow_types::llm::{CompletionRequest, CompletionResponse, LlmError, RawChunk, Usage};
use maoflow_types::model::ModelConfig;
use maoflow_types::stream::{ChannelKind, SseFrame};

use crate::chat::aggregator::ChannelAggregator;
use crate::chat::demux::Demultiplexer;
use crate::chat::locks::ConversationLocks;
use crate::chat::tokens;
use crate::llm::box_provider::BoxCompletionProvider;
use crate::llm::provider::ChunkStream;
use crate::llm::retry::{RetryPolicy, complete_with_retry, connect_with_retry};
use crate::repository::conversation::ConversationRepository;

/// Lifecycle of one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Created,
    AwaitingUpstream,
    Streaming,
    Finalizing,
    Completed,
    Failed,
}

/// Time bounds and retry schedule for a turn.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub retry: RetryPolicy,
    /// Per-attempt ceiling on connect + first chunk.
    pub connect_timeout: Duration,
    /// Ceiling on streaming time once the first chunk has arrived.
    pub max_stream: Duration,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(5),
            max_stream: Duration::from_secs(300),
        }
    }
}

/// Everything a turn needs once its two messages exist in storage.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub conversation_id: Uuid,
    /// Id of the assistant placeholder; every frame carries it.
    pub message_id: Uuid,
    pub query: String,
    pub model: ModelConfig,
    pub request: CompletionRequest,
    /// Already recorded on the user message.
    pub user_tokens: u32,
}

enum StreamEnd {
    Exhausted,
    SinkClosed,
    Upstream(LlmError),
}

pub struct TurnOrchestrator<C: ConversationRepository> {
    repo: Arc<C>,
    locks: Arc<ConversationLocks>,
    provider: BoxCompletionProvider,
    settings: TurnSettings,
    state: TurnState,
}

impl<C: ConversationRepository> TurnOrchestrator<C> {
    pub fn new(
        repo: Arc<C>,
        locks: Arc<ConversationLocks>,
        provider: BoxCompletionProvider,
        settings: TurnSettings,
    ) -> Self {
        Self {
            repo,
            locks,
            provider,
            settings,
            state: TurnState::Created,
        }
    }

    fn transition(&mut self, next: TurnState) {
        debug!(from = ?self.state, to = ?next, "Turn state transition");
        self.state = next;
    }

    /// Drive the turn to completion, writing frames into `sink`.
    ///
    /// Returns the terminal state (`Completed` or `Failed`).
    pub async fn run(self, turn: ChatTurn, sink: mpsc::Sender<SseFrame>) -> TurnState {
        let span = info_span!(
            "chat_turn",
            conversation_id = %turn.conversation_id,
            message_id = %turn.message_id,
            gen_ai.operation.name = "chat",
            model = %turn.model.model_name,
            gen_ai.request.temperature = turn.request.temperature,
        );
        self.drive(turn, sink).instrument(span).await
    }

    async fn drive(mut self, turn: ChatTurn, sink: mpsc::Sender<SseFrame>) -> TurnState {
        let started = Instant::now();
        let mut aggregator = ChannelAggregator::new(turn.conversation_id, turn.message_id);
        let mut usage = None;

        self.transition(TurnState::AwaitingUpstream);
        let end = match self.open(&turn.request).await {
            Ok(upstream) => {
                self.transition(TurnState::Streaming);
                let deadline = Instant::now() + self.settings.max_stream;
                pump(upstream, &mut aggregator, &mut usage, &sink, deadline).await
            }
            Err(err) => StreamEnd::Upstream(err),
        };

        // Finalize always runs to completion, whether or not anyone is
        // still listening.
        self.transition(TurnState::Finalizing);
        let byte_counts = aggregator.byte_counts();
        let blocks = aggregator.finish();
        let content = blocks
            .iter()
            .find(|(kind, _)| *kind == ChannelKind::Message)
            .map(|(_, text)| text.clone());
        let record = TurnRecord {
            conversation_id: turn.conversation_id,
            model_id: turn.model.model_id,
            assistant_message_id: turn.message_id,
            assistant_tokens: tokens::assistant_tokens(usage, &blocks),
            blocks,
            content,
            user_tokens: turn.user_tokens,
            processing_time: started.elapsed().as_secs_f64(),
            message_delta: 2,
            finished_at: Utc::now(),
        };
        let persisted = self
            .locks
            .run_exclusive(turn.conversation_id, self.repo.finalize_turn(&record))
            .await;

        let mut errors = Vec::new();
        match end {
            StreamEnd::Exhausted => {
                info!(
                    blocks = record.blocks.len(),
                    tokens = record.assistant_tokens,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Upstream stream finished"
                );
            }
            StreamEnd::SinkClosed => {
                info!(
                    blocks = record.blocks.len(),
                    "Client disconnected, upstream released"
                );
            }
            StreamEnd::Upstream(err) => {
                warn!(error = %err, blocks = record.blocks.len(), "Upstream failed");
                errors.push(err.to_string());
            }
        }
        if let Err(err) = &persisted {
            let [think, message, action, observation] = byte_counts.map(|(_, n)| n);
            error!(
                error = %err,
                think_bytes = think,
                message_bytes = message,
                action_bytes = action,
                observation_bytes = observation,
                "Failed to persist chat turn, aggregated content lost"
            );
            errors.push(format!("failed to save response: {err}"));
        }

        // Send failures here only mean the client is already gone.
        if !errors.is_empty() {
            let _ = sink
                .send(SseFrame::error(
                    turn.conversation_id,
                    turn.message_id,
                    errors.join("; "),
                ))
                .await;
        }
        let _ = sink
            .send(SseFrame::done(turn.conversation_id, turn.message_id))
            .await;

        let terminal = if errors.is_empty() {
            TurnState::Completed
        } else {
            TurnState::Failed
        };
        self.transition(terminal);
        terminal
    }

    async fn open(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError> {
        if request.stream {
            let connected = connect_with_retry(
                &self.provider,
                request,
                &self.settings.retry,
                self.settings.connect_timeout,
            )
            .await?;
            if connected.attempts > 1 {
                info!(attempts = connected.attempts, "Upstream connected after retry");
            }
            Ok(connected.stream)
        } else {
            let response = complete_with_retry(
                &self.provider,
                request,
                &self.settings.retry,
                self.settings.max_stream,
            )
            .await?;
            Ok(response_chunks(response))
        }
    }
}

/// Feed a whole response through the same pipeline as a streamed one.
fn response_chunks(response: CompletionResponse) -> ChunkStream {
    let mut chunks = Vec::with_capacity(3);
    if let Some(reasoning) = response.reasoning {
        chunks.push(Ok(RawChunk::reasoning(reasoning)));
    }
    chunks.push(Ok(RawChunk::content(response.content)));
    if let Some(usage) = response.usage {
        chunks.push(Ok(RawChunk::usage(usage)));
    }
    Box::pin(stream::iter(chunks))
}

/// Pull, classify, aggregate, forward; one chunk at a time.
async fn pump(
    mut upstream: ChunkStream,
    aggregator: &mut ChannelAggregator,
    usage: &mut Option<Usage>,
    sink: &mpsc::Sender<SseFrame>,
    deadline: Instant,
) -> StreamEnd {
    let mut demux = Demultiplexer::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = sink.closed() => return StreamEnd::SinkClosed,
            next = tokio::time::timeout_at(deadline, upstream.next()) => next,
        };

        let chunk = match next {
            Err(_) => {
                return StreamEnd::Upstream(LlmError::MidStreamFailure(
                    "stream exceeded maximum duration".to_string(),
                ));
            }
            Ok(None) => return StreamEnd::Exhausted,
            Ok(Some(Err(err))) => return StreamEnd::Upstream(err),
            Ok(Some(Ok(chunk))) => chunk,
        };

        if chunk.usage.is_some() {
            *usage = chunk.usage;
        }
        let Some(delta) = demux.classify(chunk) else {
            continue;
        };
        if delta.starts_segment {
            debug!(channel = %delta.kind, "Channel segment started");
        }

        let event = aggregator.apply(delta);
        if sink.send(SseFrame::from(event)).await.is_err() {
            return StreamEnd::SinkClosed;
        }
    }
}
