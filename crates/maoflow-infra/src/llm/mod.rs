//! Upstream LLM provider implementations.
//!
//! [`HttpProviderFactory`] builds an [`OpenAiCompatibleProvider`] for each
//! chat turn from the conversation's model snapshot. All providers share
//! one `reqwest::Client` and therefore one connection pool.

pub mod openai_compat;

use std::time::Duration;

use secrecy::SecretString;

use maoflow_core::llm::box_provider::BoxCompletionProvider;
use maoflow_core::llm::factory::ProviderFactory;
use maoflow_types::llm::LlmError;
use maoflow_types::model::ModelConfig;

use self::openai_compat::OpenAiCompatibleProvider;

pub struct HttpProviderFactory {
    client: reqwest::Client,
}

impl HttpProviderFactory {
    /// No overall request timeout is set: streams may legitimately run for
    /// minutes, and the chat pipeline enforces its own deadlines.
    pub fn new(connect_timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| LlmError::UpstreamUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn build(&self, config: &ModelConfig) -> Result<BoxCompletionProvider, LlmError> {
        let base_url = config.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(LlmError::UpstreamRejected {
                status: None,
                message: format!("invalid base URL '{base_url}'"),
            });
        }

        let provider = OpenAiCompatibleProvider::new(
            self.client.clone(),
            base_url,
            SecretString::from(config.api_key.clone()),
        );
        Ok(BoxCompletionProvider::new(provider))
    }
}
