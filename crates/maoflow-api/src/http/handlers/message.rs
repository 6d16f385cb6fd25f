//! Message content block handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use maoflow_types::chat::MessageItem;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// GET /api/v1/messages/{id}/items - blocks in channel priority order.
pub async fn list_message_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MessageItem>>>, AppError> {
    let timer = RequestTimer::start();
    let items = state.conversation_service.list_message_items(&id).await?;
    Ok(Json(timer.finish(items).with_link(
        "self",
        format!("/api/v1/messages/{id}/items"),
    )))
}
