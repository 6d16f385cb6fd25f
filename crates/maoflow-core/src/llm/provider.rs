//! CompletionProvider trait definition.
//!
//! Uses RPITIT for `complete`, and `Pin<Box<dyn Stream>>` for `stream`
//! (streams need to be object-safe for the BoxCompletionProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use maoflow_types::llm::{CompletionRequest, CompletionResponse, LlmError, RawChunk};

/// Lazy sequence of raw upstream increments.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<RawChunk, LlmError>> + Send + 'static>>;

/// Trait for upstream chat-completion backends.
///
/// Implementations live in maoflow-infra (e.g., `OpenAiCompatibleProvider`).
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai_compatible").
    fn name(&self) -> &str;

    /// Send a non-streaming request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Open a streaming request.
    ///
    /// The stream is lazy: no network I/O happens until it is first polled,
    /// and connection failures surface as its first item. Dropping the
    /// stream releases the upstream connection.
    fn stream(&self, request: CompletionRequest) -> ChunkStream;
}
