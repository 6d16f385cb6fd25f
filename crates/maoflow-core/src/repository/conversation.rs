//! Conversation repository trait definition.
//!
//! Covers conversations, their messages, and the per-message content blocks
//! written when a chat turn is finalized.

use maoflow_types::chat::{Conversation, ConversationStatus, Message, MessageItem, TurnRecord};
use maoflow_types::error::RepositoryError;
use uuid::Uuid;

use super::Page;

/// Filter criteria for listing a user's conversations.
#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    pub status: Option<ConversationStatus>,
    pub page: Page,
}

/// Repository trait for conversation and message persistence.
///
/// Implementations live in maoflow-infra (e.g., `SqliteConversationRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ConversationRepository: Send + Sync {
    // -----------------------------------------------------------------------
    // Conversations
    // -----------------------------------------------------------------------

    fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    fn get_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// List a user's conversations, most recently updated first.
    fn list_conversations(
        &self,
        user_id: &Uuid,
        filter: &ConversationFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;

    /// Persist the editable fields (title, description, system prompt,
    /// status, meta info). Counters are never written through this call.
    fn update_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Insert a turn's user message and assistant placeholder together.
    /// Either both rows are written or neither is.
    fn create_turn_messages(
        &self,
        user: &Message,
        assistant: &Message,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_message(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Message>, RepositoryError>> + Send;

    /// All messages of a conversation, ordered by created_at ASC.
    fn list_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Content blocks of a message, ordered by `order` ASC.
    fn list_message_items(
        &self,
        message_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<MessageItem>, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Turn finalization
    // -----------------------------------------------------------------------

    /// Apply everything a finished turn writes, in one transaction:
    /// - one content block per entry in `record.blocks`
    /// - assistant message content (when `record.content` is set), tokens
    ///   and processing time
    /// - conversation `message_count`, `total_tokens`, `last_message_at`
    /// - the bound model's `total_tokens_used`
    fn finalize_turn(
        &self,
        record: &TurnRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
