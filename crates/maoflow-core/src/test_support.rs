//! In-memory fakes shared by the pipeline and service tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures_util::{StreamExt, stream};
use uuid::Uuid;

use maoflow_types::chat::{
    Conversation, ConversationStatus, Message, MessageItem, MessageRole, TurnRecord,
};
use maoflow_types::error::RepositoryError;
use maoflow_types::llm::{CompletionRequest, CompletionResponse, LlmError, RawChunk};
use maoflow_types::model::{LlmModel, ModelConfig, ProviderType};
use maoflow_types::user::User;

use crate::chat::tokens::estimate_tokens;
use crate::llm::box_provider::BoxCompletionProvider;
use crate::llm::factory::ProviderFactory;
use crate::llm::provider::{ChunkStream, CompletionProvider};
use crate::repository::Page;
use crate::repository::conversation::{ConversationFilter, ConversationRepository};
use crate::repository::model::{ModelFilter, ModelRepository};
use crate::repository::user::UserRepository;

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

/// What one `stream()` call yields.
#[derive(Debug, Clone)]
pub enum Script {
    Chunks(Vec<Result<RawChunk, LlmError>>),
    ChunksThenHang(Vec<RawChunk>),
    /// Yield `head`, wait `pause`, then yield `tail`.
    Paced {
        head: Vec<RawChunk>,
        pause: Duration,
        tail: Vec<RawChunk>,
    },
    Fail(LlmError),
    Hang,
}

#[derive(Default)]
struct Shared {
    scripts: Mutex<VecDeque<Script>>,
    completions: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    configs: Mutex<Vec<ModelConfig>>,
    calls: Arc<AtomicU32>,
    released: Arc<AtomicBool>,
}

/// Plays back scripts in order; the last one repeats once the queue is drained.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    shared: Arc<Shared>,
}

struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn next_or_repeat<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        let provider = Self::default();
        *provider.shared.scripts.lock().unwrap() = scripts.into();
        provider
    }

    pub fn with_completions(self, completions: Vec<Result<CompletionResponse, LlmError>>) -> Self {
        *self.shared.completions.lock().unwrap() = completions.into();
        self
    }

    /// Number of `stream()` plus `complete()` calls so far.
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.shared.calls)
    }

    /// Set once the most recent stream has been dropped.
    pub fn released(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shared.released)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn configs(&self) -> Vec<ModelConfig> {
        self.shared.configs.lock().unwrap().clone()
    }
}

impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.shared.calls.fetch_add(1, Ordering::SeqCst);
        self.shared.requests.lock().unwrap().push(request.clone());
        next_or_repeat(&self.shared.completions)
            .unwrap_or_else(|| Err(LlmError::UpstreamUnavailable("no completion scripted".into())))
    }

    fn stream(&self, request: CompletionRequest) -> ChunkStream {
        self.shared.calls.fetch_add(1, Ordering::SeqCst);
        self.shared.requests.lock().unwrap().push(request);
        self.shared.released.store(false, Ordering::SeqCst);

        let script = next_or_repeat(&self.shared.scripts).unwrap_or(Script::Chunks(vec![]));
        let inner: ChunkStream = match script {
            Script::Chunks(items) => Box::pin(stream::iter(items)),
            Script::ChunksThenHang(chunks) => Box::pin(
                stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending()),
            ),
            Script::Paced { head, pause, tail } => Box::pin(
                stream::iter(head.into_iter().map(Ok)).chain(
                    stream::once(async move {
                        tokio::time::sleep(pause).await;
                        stream::iter(tail.into_iter().map(Ok))
                    })
                    .flatten(),
                ),
            ),
            Script::Fail(err) => Box::pin(stream::iter(vec![Err(err)])),
            Script::Hang => Box::pin(stream::pending()),
        };

        let guard = ReleaseGuard(Arc::clone(&self.shared.released));
        Box::pin(inner.map(move |item| {
            let _ = &guard;
            item
        }))
    }
}

impl ProviderFactory for ScriptedProvider {
    fn build(&self, config: &ModelConfig) -> Result<BoxCompletionProvider, LlmError> {
        self.shared.configs.lock().unwrap().push(config.clone());
        Ok(BoxCompletionProvider::new(self.clone()))
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    users: Vec<User>,
    models: HashMap<Uuid, LlmModel>,
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<Message>,
    items: Vec<MessageItem>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_finalize: AtomicBool,
    fail_turn_insert: AtomicBool,
}

pub fn sample_model() -> LlmModel {
    let now = Utc::now();
    LlmModel {
        id: Uuid::now_v7(),
        name: "Test model".into(),
        description: None,
        provider: ProviderType::OpenaiCompatible,
        model_name: "test-model".into(),
        api_key: "sk-test".into(),
        base_url: None,
        default_temperature: 0.7,
        default_max_tokens: None,
        default_system_prompt: None,
        is_active: true,
        priority: 0,
        total_tokens_used: 0,
        daily_token_limit: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_conversation(user_id: Uuid, model_id: Uuid) -> Conversation {
    let now = Utc::now();
    Conversation {
        id: Uuid::now_v7(),
        user_id,
        model_id,
        title: "Test conversation".into(),
        description: None,
        system_prompt: None,
        status: ConversationStatus::Active,
        message_count: 0,
        total_tokens: 0,
        last_message_at: None,
        meta_info: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_model(&self, model: LlmModel) {
        self.state.lock().unwrap().models.insert(model.id, model);
    }

    pub fn insert_conversation(&self, conversation: Conversation) {
        self.state
            .lock()
            .unwrap()
            .conversations
            .insert(conversation.id, conversation);
    }

    /// Insert an active model and a conversation bound to it.
    pub fn seed_conversation(&self) -> (Conversation, LlmModel) {
        let model = sample_model();
        let conversation = sample_conversation(Uuid::now_v7(), model.id);
        self.insert_model(model.clone());
        self.insert_conversation(conversation.clone());
        (conversation, model)
    }

    /// Insert a user message and an empty assistant placeholder.
    pub fn seed_turn_messages(&self, conversation: &Conversation, query: &str) -> (Message, Message) {
        let mut user = Message::text(conversation.id, conversation.user_id, MessageRole::User, query);
        user.tokens = estimate_tokens(query);
        let assistant =
            Message::text(conversation.id, conversation.user_id, MessageRole::Assistant, "");
        let mut state = self.state.lock().unwrap();
        state.messages.push(user.clone());
        state.messages.push(assistant.clone());
        (user, assistant)
    }

    pub fn fail_turn_insert(&self) {
        self.fail_turn_insert.store(true, Ordering::SeqCst);
    }

    pub fn fail_finalize(&self) {
        self.fail_finalize.store(true, Ordering::SeqCst);
    }

    pub fn message(&self, id: &Uuid) -> Option<Message> {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .find(|m| m.id == *id)
            .cloned()
    }

    pub fn messages_in(&self, conversation_id: &Uuid) -> Vec<Message> {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .cloned()
            .collect()
    }

    pub fn items_for(&self, message_id: &Uuid) -> Vec<MessageItem> {
        let mut items: Vec<MessageItem> = self
            .state
            .lock()
            .unwrap()
            .items
            .iter()
            .filter(|i| i.message_id == *message_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.order);
        items
    }

    pub fn conversation(&self, id: &Uuid) -> Option<Conversation> {
        self.state.lock().unwrap().conversations.get(id).cloned()
    }

    pub fn model(&self, id: &Uuid) -> Option<LlmModel> {
        self.state.lock().unwrap().models.get(id).cloned()
    }
}

impl ConversationRepository for MemoryStore {
    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        self.insert_conversation(conversation.clone());
        Ok(conversation.clone())
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self.conversation(id))
    }

    async fn list_conversations(
        &self,
        user_id: &Uuid,
        filter: &ConversationFilter,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let mut found: Vec<Conversation> = self
            .state
            .lock()
            .unwrap()
            .conversations
            .values()
            .filter(|c| c.user_id == *user_id)
            .filter(|c| filter.status.is_none_or(|s| c.status == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(found
            .into_iter()
            .skip(filter.page.offset.max(0) as usize)
            .take(filter.page.limit.max(0) as usize)
            .collect())
    }

    async fn update_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let existing = state
            .conversations
            .get_mut(&conversation.id)
            .ok_or(RepositoryError::NotFound)?;
        existing.title = conversation.title.clone();
        existing.description = conversation.description.clone();
        existing.system_prompt = conversation.system_prompt.clone();
        existing.status = conversation.status;
        existing.meta_info = conversation.meta_info.clone();
        existing.updated_at = conversation.updated_at;
        Ok(existing.clone())
    }

    async fn create_turn_messages(
        &self,
        user: &Message,
        assistant: &Message,
    ) -> Result<(), RepositoryError> {
        if self.fail_turn_insert.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk I/O error".into()));
        }
        let mut state = self.state.lock().unwrap();
        state.messages.push(user.clone());
        state.messages.push(assistant.clone());
        Ok(())
    }

    async fn get_message(&self, id: &Uuid) -> Result<Option<Message>, RepositoryError> {
        Ok(self.message(id))
    }

    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, RepositoryError> {
        Ok(self.messages_in(conversation_id))
    }

    async fn list_message_items(
        &self,
        message_id: &Uuid,
    ) -> Result<Vec<MessageItem>, RepositoryError> {
        Ok(self.items_for(message_id))
    }

    async fn finalize_turn(&self, record: &TurnRecord) -> Result<(), RepositoryError> {
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("database is locked".into()));
        }
        let mut state = self.state.lock().unwrap();
        if !state.conversations.contains_key(&record.conversation_id) {
            return Err(RepositoryError::NotFound);
        }

        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == record.assistant_message_id)
            .ok_or(RepositoryError::NotFound)?;
        if let Some(content) = &record.content {
            message.content = content.clone();
        }
        message.tokens = record.assistant_tokens;
        message.processing_time = record.processing_time;
        message.updated_at = record.finished_at;

        for (kind, text) in &record.blocks {
            state.items.push(MessageItem {
                id: Uuid::now_v7(),
                message_id: record.assistant_message_id,
                conversation_id: record.conversation_id,
                kind: *kind,
                content: text.clone(),
                order: kind.priority(),
                created_at: record.finished_at,
            });
        }

        if let Some(conversation) = state.conversations.get_mut(&record.conversation_id) {
            conversation.message_count += record.message_delta;
            conversation.total_tokens += record.token_delta();
            conversation.last_message_at = Some(record.finished_at);
            conversation.updated_at = record.finished_at;
        }
        if let Some(model) = state.models.get_mut(&record.model_id) {
            model.total_tokens_used += record.token_delta();
        }
        Ok(())
    }
}

impl ModelRepository for MemoryStore {
    async fn create(&self, model: &LlmModel) -> Result<LlmModel, RepositoryError> {
        self.insert_model(model.clone());
        Ok(model.clone())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<LlmModel>, RepositoryError> {
        Ok(self.model(id))
    }

    async fn list(&self, filter: &ModelFilter) -> Result<Vec<LlmModel>, RepositoryError> {
        let mut models: Vec<LlmModel> = self
            .state
            .lock()
            .unwrap()
            .models
            .values()
            .filter(|m| filter.is_active.is_none_or(|a| m.is_active == a))
            .cloned()
            .collect();
        models.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        Ok(models)
    }

    async fn update(&self, model: &LlmModel) -> Result<LlmModel, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if !state.models.contains_key(&model.id) {
            return Err(RepositoryError::NotFound);
        }
        state.models.insert(model.id, model.clone());
        Ok(model.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        self.state
            .lock()
            .unwrap()
            .models
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl UserRepository for MemoryStore {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(RepositoryError::Conflict(format!(
                "user '{}' already exists",
                user.username
            )));
        }
        state.users.push(user.clone());
        Ok(user.clone())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == *id)
            .cloned())
    }

    async fn list(&self, page: &Page) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn update_settings(&self, user: &User) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let existing = state
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(RepositoryError::NotFound)?;
        existing.settings = user.settings.clone();
        existing.updated_at = user.updated_at;
        Ok(existing.clone())
    }
}
