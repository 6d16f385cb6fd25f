//! Conversation CRUD handlers for the REST API.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::json;
use uuid::Uuid;

use maoflow_types::chat::{Conversation, ConversationPatch, Message, NewConversation};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

fn with_links(resp: ApiResponse<Conversation>, id: Uuid) -> ApiResponse<Conversation> {
    resp.with_link("self", format!("/api/v1/conversations/{id}"))
        .with_link("messages", format!("/api/v1/conversations/{id}/messages"))
        .with_link("chat", format!("/api/v1/conversations/{id}/chat"))
}

/// POST /api/v1/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(body): Json<NewConversation>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let timer = RequestTimer::start();
    let conversation = state.conversation_service.create_conversation(body).await?;
    let id = conversation.id;
    Ok(Json(with_links(timer.finish(conversation), id)))
}

/// GET /api/v1/conversations/{id}
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let timer = RequestTimer::start();
    let conversation = state.conversation_service.get_conversation(&id).await?;
    Ok(Json(with_links(timer.finish(conversation), id)))
}

/// PATCH /api/v1/conversations/{id}
///
/// Only title, description, system prompt, status, and meta info are
/// editable. Message and token counters belong to the chat pipeline.
pub async fn update_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ConversationPatch>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let timer = RequestTimer::start();
    let conversation = state
        .conversation_service
        .update_conversation(&id, body)
        .await?;
    Ok(Json(with_links(timer.finish(conversation), id)))
}

/// DELETE /api/v1/conversations/{id} - soft delete.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    state.conversation_service.delete_conversation(&id).await?;
    Ok(Json(timer.finish(json!({ "deleted": true, "id": id }))))
}

/// GET /api/v1/conversations/{id}/messages - oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    let timer = RequestTimer::start();
    let messages = state.conversation_service.list_messages(&id).await?;
    Ok(Json(timer.finish(messages).with_link(
        "conversation",
        format!("/api/v1/conversations/{id}"),
    )))
}
