//! OpenAI-compatible chat-completion provider.
//!
//! Talks to any endpoint implementing `POST {base_url}/chat/completions`
//! (OpenAI, DeepSeek, vLLM, Ollama, and similar gateways).
//!
//! The API key is held as a [`SecretString`] and only exposed when the
//! request headers are built.

pub mod streaming;
pub mod types;

use secrecy::SecretString;

use maoflow_core::llm::provider::{ChunkStream, CompletionProvider};
use maoflow_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use self::streaming::{authorized, check_status, open_chunk_stream, send_error};
use self::types::{ChatCompletionRequest, ChatCompletionResponse};

/// Provider bound to one model configuration's endpoint and key.
///
/// No `Debug` impl: the struct holds the API key.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl OpenAiCompatibleProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = ChatCompletionRequest::from_request(request, false);
        let response = authorized(self.client.post(self.url()), &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        let response = check_status(response).await?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| LlmError::Deserialization("response has no choices".into()))?;

        Ok(CompletionResponse {
            id: parsed.id,
            model: parsed.model,
            content: message.content.unwrap_or_default(),
            reasoning: message.reasoning_content.filter(|r| !r.is_empty()),
            usage: parsed.usage.map(Into::into),
        })
    }

    fn stream(&self, request: CompletionRequest) -> ChunkStream {
        open_chunk_stream(
            self.client.clone(),
            self.url(),
            self.api_key.clone(),
            request,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use futures_util::StreamExt;
    use maoflow_core::llm::box_provider::BoxCompletionProvider;
    use maoflow_core::llm::retry::{RetryPolicy, connect_with_retry};
    use maoflow_types::llm::{ChatMessage, MessageRole, RawChunk, Usage};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "deepseek-reasoner".into(),
            messages: vec![ChatMessage::new(MessageRole::User, "Hello")],
            temperature: 0.7,
            max_tokens: Some(256),
            stream: true,
        }
    }

    fn provider(server: &MockServer) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(
            reqwest::Client::new(),
            format!("{}/v1/", server.uri()),
            SecretString::from("test-key"),
        )
    }

    fn sse(events: &[&str]) -> ResponseTemplate {
        let body: String = events.iter().map(|e| format!("data: {e}\n\n")).collect();
        ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/event-stream")
    }

    async fn collect(stream: ChunkStream) -> Vec<Result<RawChunk, LlmError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_stream_yields_reasoning_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "deepseek-reasoner",
                "stream": true,
                "stream_options": {"include_usage": true}
            })))
            .respond_with(sse(&[
                r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#,
                r#"{"choices":[{"delta":{"reasoning_content":"Let me think"}}]}"#,
                r#"{"choices":[{"delta":{"content":"Hi"}}]}"#,
                r#"{"choices":[],"usage":{"prompt_tokens":5,"completion_tokens":3}}"#,
                "[DONE]",
            ]))
            .expect(1)
            .mount(&server)
            .await;

        let items = collect(provider(&server).stream(request())).await;
        let chunks: Vec<RawChunk> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            chunks,
            vec![
                RawChunk::default(),
                RawChunk::reasoning("Let me think"),
                RawChunk::content("Hi"),
                RawChunk::usage(Usage {
                    prompt_tokens: 5,
                    completion_tokens: 3
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(sse(&["[DONE]"]))
            .mount(&server)
            .await;

        let stream = provider(&server).stream(request());
        assert!(server.received_requests().await.unwrap().is_empty());

        let items = collect(stream).await;
        assert_eq!(items, vec![Ok(RawChunk::default())]);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_client_error_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let items = collect(provider(&server).stream(request())).await;
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0],
            Err(LlmError::UpstreamRejected {
                status: Some(401),
                message: "Incorrect API key provided".into()
            })
        );
    }

    #[tokio::test]
    async fn test_stream_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let items = collect(provider(&server).stream(request())).await;
        assert!(matches!(
            items.as_slice(),
            [Err(LlmError::UpstreamUnavailable(_))]
        ));
    }

    #[tokio::test]
    async fn test_stream_connection_refused_is_unavailable() {
        let provider = OpenAiCompatibleProvider::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/v1",
            SecretString::from("test-key"),
        );
        let items = collect(provider.stream(request())).await;
        assert!(matches!(
            items.as_slice(),
            [Err(LlmError::UpstreamUnavailable(_))]
        ));
    }

    #[tokio::test]
    async fn test_stream_truncated_before_done_fails_after_partial_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(sse(&[r#"{"choices":[{"delta":{"content":"Partial"}}]}"#]))
            .mount(&server)
            .await;

        let items = collect(provider(&server).stream(request())).await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], Ok(RawChunk::content("Partial")));
        assert!(matches!(items[2], Err(LlmError::MidStreamFailure(_))));
    }

    #[tokio::test]
    async fn test_stream_malformed_chunk_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(sse(&[
                r#"{"choices":[{"delta":{"content":"ok"}}]}"#,
                "{not json",
                "[DONE]",
            ]))
            .mount(&server)
            .await;

        let items = collect(provider(&server).stream(request())).await;
        assert_eq!(items[1], Ok(RawChunk::content("ok")));
        assert!(matches!(items[2], Err(LlmError::MidStreamFailure(_))));
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_complete_returns_content_reasoning_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "model": "deepseek-reasoner",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hi there", "reasoning_content": "short"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server).complete(&request()).await.unwrap();
        assert_eq!(response.content, "Hi there");
        assert_eq!(response.reasoning.as_deref(), Some("short"));
        assert_eq!(response.usage.map(|u| u.completion_tokens), Some(2));
    }

    #[tokio::test]
    async fn test_keyless_endpoint_sends_no_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(sse(&["[DONE]"]))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            reqwest::Client::new(),
            server.uri(),
            SecretString::from(""),
        );
        collect(provider.stream(request())).await;

        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("authorization").is_none());
    }

    /// Read one HTTP request (headers plus a `content-length` body).
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                return;
            }
        }
    }

    /// Upstream that answers 200 with a role delta at once and sends the
    /// first token only after `pause`.
    async fn slow_reasoning_upstream(pause: Duration) -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&accepted);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
                    let role = r#"data: {"choices":[{"delta":{"role":"assistant","content":""}}]}"#;
                    socket
                        .write_all(format!("{head}{role}\n\n").as_bytes())
                        .await
                        .unwrap();
                    socket.flush().await.unwrap();

                    tokio::time::sleep(pause).await;
                    let thought = r#"data: {"choices":[{"delta":{"reasoning_content":"Thinking"}}]}"#;
                    let _ = socket
                        .write_all(format!("{thought}\n\ndata: [DONE]\n\n").as_bytes())
                        .await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{addr}/v1"), accepted)
    }

    #[tokio::test]
    async fn test_open_stream_with_slow_first_token_connects_once() {
        let (base_url, accepted) = slow_reasoning_upstream(Duration::from_millis(1500)).await;
        let provider = BoxCompletionProvider::new(OpenAiCompatibleProvider::new(
            reqwest::Client::new(),
            base_url,
            SecretString::from("test-key"),
        ));
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            ..RetryPolicy::default()
        };

        let connected = connect_with_retry(&provider, &request(), &policy, Duration::from_secs(1))
            .await
            .unwrap();
        let items = collect(connected.stream).await;

        assert_eq!(connected.attempts, 1);
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(
            items,
            vec![Ok(RawChunk::default()), Ok(RawChunk::reasoning("Thinking"))]
        );
    }
}
