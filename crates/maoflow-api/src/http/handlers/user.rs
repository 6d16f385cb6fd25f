//! User handlers for the REST API.

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use maoflow_types::chat::Conversation;
use maoflow_types::user::{NewUser, User};

use crate::http::error::AppError;
use crate::http::extractors::query::{ConversationListQuery, PageQuery};
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<NewUser>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let timer = RequestTimer::start();
    let user = state.user_service.create_user(body).await?;
    let href = format!("/api/v1/users/{}", user.id);
    Ok(Json(timer.finish(user).with_link("self", href)))
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    let timer = RequestTimer::start();
    let users = state.user_service.list_users(query.to_page()?).await?;
    Ok(Json(timer.finish(users).with_link("self", "/api/v1/users")))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let timer = RequestTimer::start();
    let user = state.user_service.get_user(&id).await?;
    Ok(Json(
        timer
            .finish(user)
            .with_link("self", format!("/api/v1/users/{id}"))
            .with_link("conversations", format!("/api/v1/users/{id}/conversations")),
    ))
}

/// GET /api/v1/users/{id}/settings
pub async fn get_user_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    let settings = state.user_service.get_settings(&id).await?;
    Ok(Json(timer.finish(settings).with_link(
        "self",
        format!("/api/v1/users/{id}/settings"),
    )))
}

/// PUT /api/v1/users/{id}/settings - merges into the stored settings.
pub async fn update_user_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    let settings = state.user_service.update_settings(&id, body).await?;
    Ok(Json(timer.finish(settings).with_link(
        "self",
        format!("/api/v1/users/{id}/settings"),
    )))
}

/// GET /api/v1/users/{user_id}/conversations - newest activity first.
pub async fn list_user_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ConversationListQuery>,
) -> Result<Json<ApiResponse<Vec<Conversation>>>, AppError> {
    let timer = RequestTimer::start();
    let filter = query.to_filter()?;
    // An unknown user is a 404, not an empty list.
    state.user_service.get_user(&user_id).await?;
    let conversations = state
        .conversation_service
        .list_conversations(&user_id, filter)
        .await?;
    Ok(Json(timer.finish(conversations).with_link(
        "self",
        format!("/api/v1/users/{user_id}/conversations"),
    )))
}
