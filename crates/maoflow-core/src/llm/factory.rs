//! Per-turn provider construction.
//!
//! Every conversation is bound to its own model row, so each turn needs a
//! client pointed at that row's endpoint and credentials.

use maoflow_types::llm::LlmError;
use maoflow_types::model::ModelConfig;

use super::box_provider::BoxCompletionProvider;

/// Builds a ready-to-use provider for a model snapshot.
///
/// Implementations may share connection pools across calls; the returned
/// provider is owned by one turn.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, config: &ModelConfig) -> Result<BoxCompletionProvider, LlmError>;
}

impl<T: ProviderFactory + ?Sized> ProviderFactory for std::sync::Arc<T> {
    fn build(&self, config: &ModelConfig) -> Result<BoxCompletionProvider, LlmError> {
        (**self).build(config)
    }
}
