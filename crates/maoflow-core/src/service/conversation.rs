//! Conversation management service.
//!
//! Create, read, patch and soft-delete conversations, plus read access to
//! their messages and content blocks. Counters are owned by the chat
//! pipeline and never written here.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use maoflow_types::chat::{
    Conversation, ConversationPatch, ConversationStatus, Message, MessageItem, NewConversation,
};
use maoflow_types::error::ServiceError;

use crate::repository::conversation::{ConversationFilter, ConversationRepository};
use crate::repository::model::ModelRepository;
use crate::repository::user::UserRepository;

pub struct ConversationService<C, M, U>
where
    C: ConversationRepository,
    M: ModelRepository,
    U: UserRepository,
{
    conversations: Arc<C>,
    models: Arc<M>,
    users: Arc<U>,
}

impl<C, M, U> ConversationService<C, M, U>
where
    C: ConversationRepository,
    M: ModelRepository,
    U: UserRepository,
{
    pub fn new(conversations: Arc<C>, models: Arc<M>, users: Arc<U>) -> Self {
        Self {
            conversations,
            models,
            users,
        }
    }

    /// Create a conversation owned by an existing user and bound to an
    /// existing model.
    pub async fn create_conversation(
        &self,
        new: NewConversation,
    ) -> Result<Conversation, ServiceError> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(ServiceError::Validation("title must not be empty".into()));
        }
        if self.users.get(&new.user_id).await?.is_none() {
            return Err(ServiceError::NotFound("user"));
        }
        if self.models.get(&new.model_id).await?.is_none() {
            return Err(ServiceError::Validation(format!(
                "model {} does not exist",
                new.model_id
            )));
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::now_v7(),
            user_id: new.user_id,
            model_id: new.model_id,
            title,
            description: new.description,
            system_prompt: new.system_prompt,
            status: ConversationStatus::Active,
            message_count: 0,
            total_tokens: 0,
            last_message_at: None,
            meta_info: new.meta_info.unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
            updated_at: now,
        };
        let conversation = self.conversations.create_conversation(&conversation).await?;
        info!(conversation_id = %conversation.id, user_id = %conversation.user_id, "Conversation created");
        Ok(conversation)
    }

    /// Deleted conversations are reported as missing.
    pub async fn get_conversation(&self, id: &Uuid) -> Result<Conversation, ServiceError> {
        self.conversations
            .get_conversation(id)
            .await?
            .filter(|c| c.status != ConversationStatus::Deleted)
            .ok_or(ServiceError::NotFound("conversation"))
    }

    pub async fn list_conversations(
        &self,
        user_id: &Uuid,
        filter: ConversationFilter,
    ) -> Result<Vec<Conversation>, ServiceError> {
        Ok(self.conversations.list_conversations(user_id, &filter).await?)
    }

    pub async fn update_conversation(
        &self,
        id: &Uuid,
        patch: ConversationPatch,
    ) -> Result<Conversation, ServiceError> {
        let mut conversation = self.get_conversation(id).await?;
        if let Some(title) = patch.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(ServiceError::Validation("title must not be empty".into()));
            }
            conversation.title = title;
        }
        if let Some(description) = patch.description {
            conversation.description = Some(description);
        }
        if let Some(prompt) = patch.system_prompt {
            conversation.system_prompt = Some(prompt);
        }
        if let Some(status) = patch.status {
            conversation.status = status;
        }
        if let Some(meta) = patch.meta_info {
            conversation.meta_info = meta;
        }
        conversation.updated_at = Utc::now();

        Ok(self.conversations.update_conversation(&conversation).await?)
    }

    /// Soft delete: the row stays, with status `deleted`.
    pub async fn delete_conversation(&self, id: &Uuid) -> Result<(), ServiceError> {
        let patch = ConversationPatch {
            status: Some(ConversationStatus::Deleted),
            ..Default::default()
        };
        self.update_conversation(id, patch).await?;
        info!(conversation_id = %id, "Conversation deleted");
        Ok(())
    }

    pub async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, ServiceError> {
        self.get_conversation(conversation_id).await?;
        Ok(self.conversations.list_messages(conversation_id).await?)
    }

    pub async fn list_message_items(
        &self,
        message_id: &Uuid,
    ) -> Result<Vec<MessageItem>, ServiceError> {
        if self.conversations.get_message(message_id).await?.is_none() {
            return Err(ServiceError::NotFound("message"));
        }
        Ok(self.conversations.list_message_items(message_id).await?)
    }
}
