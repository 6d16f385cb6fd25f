//! SSE adapter for streaming `/chat/completions` responses.
//!
//! The response body is parsed with `eventsource-stream`. Each `data:`
//! payload becomes zero or more [`RawChunk`]s; `data: [DONE]` ends the
//! stream. A body that closes before `[DONE]` is a mid-stream failure.
//!
//! An accepted response first yields one empty chunk, so callers timing the
//! connection see the upstream answer before the model's first token.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use maoflow_core::llm::provider::ChunkStream;
use maoflow_types::llm::{CompletionRequest, LlmError, RawChunk};

use super::types::{ChatCompletionChunk, ChatCompletionRequest, ErrorBody};

const DONE_MARKER: &str = "[DONE]";

/// Open a lazy streaming completion. Nothing is sent until the first poll.
pub fn open_chunk_stream(
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
    request: CompletionRequest,
) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let body = ChatCompletionRequest::from_request(&request, true);
        let response = authorized(client.post(&url), &api_key)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        let response = check_status(response).await?;
        yield RawChunk::default();

        let mut events = response.bytes_stream().eventsource();
        let mut finished = false;
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| LlmError::MidStreamFailure(e.to_string()))?;
            let data = event.data.trim();
            if data == DONE_MARKER {
                finished = true;
                break;
            }
            if data.is_empty() {
                continue;
            }
            let chunk: ChatCompletionChunk = serde_json::from_str(data)
                .map_err(|e| LlmError::MidStreamFailure(format!("malformed chunk: {e}")))?;
            for raw in split_chunk(chunk)? {
                yield raw;
            }
        }

        if !finished {
            Err::<(), _>(LlmError::MidStreamFailure("stream closed before [DONE]".into()))?;
        }
    })
}

/// Attach the bearer token. Keyless local endpoints get no header.
pub(crate) fn authorized(
    builder: reqwest::RequestBuilder,
    api_key: &SecretString,
) -> reqwest::RequestBuilder {
    let key = api_key.expose_secret();
    if key.is_empty() {
        builder
    } else {
        builder.bearer_auth(key)
    }
}

pub(crate) fn send_error(e: reqwest::Error) -> LlmError {
    LlmError::UpstreamUnavailable(format!("HTTP request failed: {e}"))
}

/// 5xx is transient; every other non-success status is a refusal.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);

    if status.is_server_error() {
        Err(LlmError::UpstreamUnavailable(format!("HTTP {status}: {message}")))
    } else {
        Err(LlmError::UpstreamRejected {
            status: Some(status.as_u16()),
            message,
        })
    }
}

/// Only the first choice is read. A delta may carry both fields; reasoning
/// is emitted first.
fn split_chunk(chunk: ChatCompletionChunk) -> Result<Vec<RawChunk>, LlmError> {
    if let Some(err) = chunk.error {
        return Err(LlmError::MidStreamFailure(err.message));
    }

    let mut out = Vec::new();
    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(text) = choice.delta.reasoning_content.filter(|t| !t.is_empty()) {
            out.push(RawChunk::reasoning(text));
        }
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            out.push(RawChunk::content(text));
        }
    }
    if let Some(usage) = chunk.usage {
        out.push(RawChunk::usage(usage.into()));
    }
    Ok(out)
}
