//! SSE chat streaming handler.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::StreamExt;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use maoflow_types::chat::ChatRequest;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /api/v1/conversations/{id}/chat - stream one chat turn.
///
/// Validation, conversation lookup, and the two message inserts happen
/// before the response starts, so those failures come back as plain JSON
/// errors. Once the stream is open every frame is an unnamed `data:` event
/// and the last one is always `done`. Dropping the response closes the
/// frame channel, which the turn treats as a client disconnect.
pub async fn stream_chat(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let handle = state.chat_service.start_turn(conversation_id, body).await?;
    tracing::debug!(
        conversation_id = %handle.conversation_id,
        message_id = %handle.message_id,
        "Opening chat event stream"
    );

    let events = ReceiverStream::new(handle.frames)
        .map(|frame| Ok::<_, Infallible>(Event::default().data(frame.to_json())));

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
