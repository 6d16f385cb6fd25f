//! Chat service: validates a query, records the turn's two messages, and
//! hands the rest to a spawned [`TurnOrchestrator`].
//!
//! Everything that can fail here fails before any frame is produced, so the
//! HTTP layer can still answer with a plain status code.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use maoflow_types::chat::{ChatRequest, ConversationStatus, Message, MessageRole};
use maoflow_types::config::GlobalConfig;
use maoflow_types::error::ChatError;
use maoflow_types::llm::{ChatMessage, CompletionRequest};
use maoflow_types::stream::SseFrame;

use crate::chat::locks::ConversationLocks;
use crate::chat::tokens::estimate_tokens;
use crate::chat::turn::{ChatTurn, TurnOrchestrator, TurnSettings};
use crate::llm::box_provider::BoxCompletionProvider;
use crate::llm::factory::ProviderFactory;
use crate::llm::retry::RetryPolicy;
use crate::repository::conversation::ConversationRepository;
use crate::repository::model::ModelRepository;

const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;

/// Defaults and bounds applied to every turn.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Endpoint for models without their own `base_url`.
    pub default_base_url: String,
    /// Used when neither the request nor the model gives a usable value.
    pub default_temperature: f64,
    pub turn: TurnSettings,
}

impl ChatSettings {
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            default_base_url: config.upstream.default_base_url.clone(),
            default_temperature: config.upstream.default_temperature,
            turn: TurnSettings {
                retry: RetryPolicy::from(&config.retry),
                connect_timeout: Duration::from_secs(config.upstream.connect_timeout_secs),
                max_stream: Duration::from_secs(config.upstream.max_stream_secs),
            },
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&GlobalConfig::default())
    }
}

/// A started turn. `frames` ends after exactly one `done` frame.
#[derive(Debug)]
pub struct TurnHandle {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub frames: mpsc::Receiver<SseFrame>,
}

/// Entry point for chat turns.
///
/// Generic over the repositories and provider factory to maintain clean
/// architecture (maoflow-core never depends on maoflow-infra).
pub struct ChatService<C, M, F>
where
    C: ConversationRepository,
    M: ModelRepository,
    F: ProviderFactory,
{
    conversations: Arc<C>,
    models: Arc<M>,
    providers: F,
    locks: Arc<ConversationLocks>,
    settings: ChatSettings,
}

impl<C, M, F> ChatService<C, M, F>
where
    C: ConversationRepository + 'static,
    M: ModelRepository,
    F: ProviderFactory,
{
    pub fn new(conversations: Arc<C>, models: Arc<M>, providers: F, settings: ChatSettings) -> Self {
        Self {
            conversations,
            models,
            providers,
            locks: Arc::new(ConversationLocks::new()),
            settings,
        }
    }

    /// Validate the request and persist the user message plus an empty
    /// assistant placeholder.
    pub async fn prepare_turn(
        &self,
        conversation_id: Uuid,
        request: ChatRequest,
    ) -> Result<(ChatTurn, BoxCompletionProvider), ChatError> {
        if request.query.trim().is_empty() {
            return Err(ChatError::EmptyQuery);
        }
        if let Some(t) = request.temperature {
            if !TEMPERATURE_RANGE.contains(&t) {
                return Err(ChatError::InvalidTemperature(t));
            }
        }

        let conversation = self
            .conversations
            .get_conversation(&conversation_id)
            .await?
            .filter(|c| c.status != ConversationStatus::Deleted)
            .ok_or(ChatError::ConversationNotFound(conversation_id))?;

        let model = self
            .models
            .get(&conversation.model_id)
            .await?
            .ok_or_else(|| {
                ChatError::InvalidModel(format!("model {} does not exist", conversation.model_id))
            })?;
        if !model.is_active {
            return Err(ChatError::InvalidModel(format!(
                "model '{}' is inactive",
                model.name
            )));
        }
        if model.model_name.trim().is_empty() {
            return Err(ChatError::InvalidModel(format!(
                "model '{}' has no upstream model name",
                model.name
            )));
        }

        let config = model.snapshot(&self.settings.default_base_url);
        let provider = self
            .providers
            .build(&config)
            .map_err(|e| ChatError::InvalidModel(e.to_string()))?;

        let history = self.conversations.list_messages(&conversation_id).await?;
        let system_prompt = non_blank(conversation.system_prompt.as_deref())
            .or_else(|| non_blank(model.default_system_prompt.as_deref()));

        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(prompt) = system_prompt {
            messages.push(ChatMessage::new(MessageRole::System, prompt));
        }
        messages.extend(
            history
                .iter()
                .filter(|m| !m.content.is_empty())
                .map(|m| ChatMessage::new(m.role, m.content.clone())),
        );
        messages.push(ChatMessage::new(MessageRole::User, request.query.clone()));

        let temperature = request
            .temperature
            .or(Some(config.default_temperature).filter(|t| TEMPERATURE_RANGE.contains(t)))
            .unwrap_or(self.settings.default_temperature);

        let user_tokens = estimate_tokens(&request.query);
        let mut user_message = Message::text(
            conversation_id,
            conversation.user_id,
            MessageRole::User,
            request.query.clone(),
        );
        user_message.tokens = user_tokens;

        let placeholder = Message::text(
            conversation_id,
            conversation.user_id,
            MessageRole::Assistant,
            "",
        );
        self.conversations
            .create_turn_messages(&user_message, &placeholder)
            .await?;

        info!(
            conversation_id = %conversation_id,
            message_id = %placeholder.id,
            history = history.len(),
            temperature,
            stream = request.stream,
            "Chat turn created"
        );

        let turn = ChatTurn {
            conversation_id,
            message_id: placeholder.id,
            request: CompletionRequest {
                model: config.model_name.clone(),
                messages,
                temperature,
                max_tokens: config.default_max_tokens,
                stream: request.stream,
            },
            query: request.query,
            model: config,
            user_tokens,
        };
        Ok((turn, provider))
    }

    /// Prepare a turn and spawn its orchestrator.
    pub async fn start_turn(
        &self,
        conversation_id: Uuid,
        request: ChatRequest,
    ) -> Result<TurnHandle, ChatError> {
        let (turn, provider) = self.prepare_turn(conversation_id, request).await?;

        let (tx, rx) = mpsc::channel(1);
        let handle = TurnHandle {
            conversation_id: turn.conversation_id,
            message_id: turn.message_id,
            frames: rx,
        };
        let orchestrator = TurnOrchestrator::new(
            Arc::clone(&self.conversations),
            Arc::clone(&self.locks),
            provider,
            self.settings.turn.clone(),
        );
        tokio::spawn(orchestrator.run(turn, tx));

        Ok(handle)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}
