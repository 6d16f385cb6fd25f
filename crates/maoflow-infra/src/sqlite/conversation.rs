//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `maoflow-core` for
//! conversations, messages and message content blocks.

use maoflow_core::repository::conversation::{ConversationFilter, ConversationRepository};
use maoflow_types::chat::{Conversation, Message, MessageItem, TurnRecord};
use maoflow_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_json, parse_uuid};

pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn parse_enum<T: std::str::FromStr<Err = String>>(s: &str) -> Result<T, RepositoryError> {
    s.parse().map_err(RepositoryError::Query)
}

fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let user_id: String = row.try_get("user_id").map_err(query_err)?;
    let model_id: String = row.try_get("model_id").map_err(query_err)?;
    let status: String = row.try_get("status").map_err(query_err)?;
    let message_count: i64 = row.try_get("message_count").map_err(query_err)?;
    let total_tokens: i64 = row.try_get("total_tokens").map_err(query_err)?;
    let last_message_at: Option<String> = row.try_get("last_message_at").map_err(query_err)?;
    let meta_info: String = row.try_get("meta_info").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(query_err)?;

    Ok(Conversation {
        id: parse_uuid(&id, "conversation")?,
        user_id: parse_uuid(&user_id, "user")?,
        model_id: parse_uuid(&model_id, "model")?,
        title: row.try_get("title").map_err(query_err)?,
        description: row.try_get("description").map_err(query_err)?,
        system_prompt: row.try_get("system_prompt").map_err(query_err)?,
        status: parse_enum(&status)?,
        message_count: message_count.max(0) as u32,
        total_tokens: total_tokens.max(0) as u64,
        last_message_at: last_message_at.as_deref().map(parse_datetime).transpose()?,
        meta_info: parse_json(&meta_info)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let conversation_id: String = row.try_get("conversation_id").map_err(query_err)?;
    let user_id: String = row.try_get("user_id").map_err(query_err)?;
    let role: String = row.try_get("role").map_err(query_err)?;
    let message_type: String = row.try_get("message_type").map_err(query_err)?;
    let tokens: i64 = row.try_get("tokens").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(query_err)?;

    Ok(Message {
        id: parse_uuid(&id, "message")?,
        conversation_id: parse_uuid(&conversation_id, "conversation")?,
        user_id: parse_uuid(&user_id, "user")?,
        role: parse_enum(&role)?,
        message_type: parse_enum(&message_type)?,
        content: row.try_get("content").map_err(query_err)?,
        tokens: tokens.max(0) as u32,
        processing_time: row.try_get("processing_time").map_err(query_err)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<MessageItem, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let message_id: String = row.try_get("message_id").map_err(query_err)?;
    let conversation_id: String = row.try_get("conversation_id").map_err(query_err)?;
    let kind: String = row.try_get("kind").map_err(query_err)?;
    let order: i64 = row.try_get("item_order").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;

    Ok(MessageItem {
        id: parse_uuid(&id, "message item")?,
        message_id: parse_uuid(&message_id, "message")?,
        conversation_id: parse_uuid(&conversation_id, "conversation")?,
        kind: parse_enum(&kind)?,
        content: row.try_get("content").map_err(query_err)?,
        order: order.max(0) as u32,
        created_at: parse_datetime(&created_at)?,
    })
}

async fn insert_message(
    conn: &mut sqlx::SqliteConnection,
    message: &Message,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO messages (id, conversation_id, user_id, role, message_type, content, tokens, processing_time, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(message.id.to_string())
    .bind(message.conversation_id.to_string())
    .bind(message.user_id.to_string())
    .bind(message.role.to_string())
    .bind(message.message_type.to_string())
    .bind(&message.content)
    .bind(i64::from(message.tokens))
    .bind(message.processing_time)
    .bind(format_datetime(&message.created_at))
    .bind(format_datetime(&message.updated_at))
    .execute(conn)
    .await
    .map_err(query_err)?;

    Ok(())
}

impl ConversationRepository for SqliteConversationRepository {
    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        sqlx::query(
            "INSERT INTO conversations (id, user_id, model_id, title, description, system_prompt, status, message_count, total_tokens, last_message_at, meta_info, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(conversation.id.to_string())
        .bind(conversation.user_id.to_string())
        .bind(conversation.model_id.to_string())
        .bind(&conversation.title)
        .bind(&conversation.description)
        .bind(&conversation.system_prompt)
        .bind(conversation.status.to_string())
        .bind(i64::from(conversation.message_count))
        .bind(conversation.total_tokens as i64)
        .bind(conversation.last_message_at.as_ref().map(format_datetime))
        .bind(conversation.meta_info.to_string())
        .bind(format_datetime(&conversation.created_at))
        .bind(format_datetime(&conversation.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(conversation.clone())
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_conversation).transpose()
    }

    async fn list_conversations(
        &self,
        user_id: &Uuid,
        filter: &ConversationFilter,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = match filter.status {
            Some(status) => {
                sqlx::query(
                    "SELECT * FROM conversations WHERE user_id = ? AND status = ?
                     ORDER BY updated_at DESC LIMIT ? OFFSET ?",
                )
                .bind(user_id.to_string())
                .bind(status.to_string())
                .bind(filter.page.limit)
                .bind(filter.page.offset)
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM conversations WHERE user_id = ?
                     ORDER BY updated_at DESC LIMIT ? OFFSET ?",
                )
                .bind(user_id.to_string())
                .bind(filter.page.limit)
                .bind(filter.page.offset)
                .fetch_all(&self.pool.reader)
                .await
            }
        }
        .map_err(query_err)?;

        rows.iter().map(row_to_conversation).collect()
    }

    async fn update_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        let result = sqlx::query(
            "UPDATE conversations SET title = ?, description = ?, system_prompt = ?, status = ?, meta_info = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&conversation.title)
        .bind(&conversation.description)
        .bind(&conversation.system_prompt)
        .bind(conversation.status.to_string())
        .bind(conversation.meta_info.to_string())
        .bind(format_datetime(&conversation.updated_at))
        .bind(conversation.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        // Counters may have moved since the caller read the row.
        self.get_conversation(&conversation.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn create_turn_messages(
        &self,
        user: &Message,
        assistant: &Message,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        insert_message(&mut *tx, user).await?;
        insert_message(&mut *tx, assistant).await?;
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn get_message(&self, id: &Uuid) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_message).transpose()
    }

    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, RepositoryError> {
        // rowid breaks ties between messages written in the same instant.
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(row_to_message).collect()
    }

    async fn list_message_items(
        &self,
        message_id: &Uuid,
    ) -> Result<Vec<MessageItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM message_items WHERE message_id = ? ORDER BY item_order ASC",
        )
        .bind(message_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(row_to_item).collect()
    }

    async fn finalize_turn(&self, record: &TurnRecord) -> Result<(), RepositoryError> {
        let finished_at = format_datetime(&record.finished_at);
        let token_delta = record.token_delta() as i64;

        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        for (kind, text) in &record.blocks {
            sqlx::query(
                "INSERT INTO message_items (id, message_id, conversation_id, kind, content, item_order, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT (message_id, kind) DO UPDATE SET content = excluded.content",
            )
            .bind(Uuid::now_v7().to_string())
            .bind(record.assistant_message_id.to_string())
            .bind(record.conversation_id.to_string())
            .bind(kind.to_string())
            .bind(text)
            .bind(i64::from(kind.priority()))
            .bind(&finished_at)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        let updated = sqlx::query(
            "UPDATE messages SET content = COALESCE(?, content), tokens = ?, processing_time = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(record.content.as_deref())
        .bind(i64::from(record.assistant_tokens))
        .bind(record.processing_time)
        .bind(&finished_at)
        .bind(record.assistant_message_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let updated = sqlx::query(
            "UPDATE conversations SET message_count = message_count + ?, total_tokens = total_tokens + ?, last_message_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(i64::from(record.message_delta))
        .bind(token_delta)
        .bind(&finished_at)
        .bind(&finished_at)
        .bind(record.conversation_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("UPDATE llm_models SET total_tokens_used = total_tokens_used + ? WHERE id = ?")
            .bind(token_delta)
            .bind(record.model_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;
        Ok(())
    }
}
