//! Bounded exponential backoff around the upstream connection phase.
//!
//! Only the negotiation up to the first chunk is retried. Providers yield an
//! empty chunk as soon as the upstream accepts the request, so the first
//! chunk marks the response headers, not the model's first token. Once a
//! chunk has been received the stream belongs to the caller, and any later
//! failure is terminal for the turn.

use std::future::Future;
use std::time::Duration;

use futures_util::{StreamExt, stream};
use rand::Rng;
use tracing::warn;

use maoflow_types::config::RetryConfig;
use maoflow_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::box_provider::BoxCompletionProvider;
use super::provider::ChunkStream;

/// Backoff schedule for connection attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// `base * multiplier^(attempt-1)`, capped at `max_delay`. With jitter
    /// enabled the result is scaled by a random factor in `[0.5, 1.0]`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = raw.min(self.max_delay.as_secs_f64()).max(0.0);
        let secs = if self.jitter {
            capped * rand::thread_rng().gen_range(0.5..=1.0)
        } else {
            capped
        };
        Duration::from_secs_f64(secs)
    }
}

/// A stream that has produced its first item (or ended cleanly).
pub struct Connected {
    pub stream: ChunkStream,
    pub attempts: u32,
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or
/// the attempt budget is spent.
async fn retry_connection<T, F, Fut>(
    policy: &RetryPolicy,
    provider: &str,
    mut attempt: F,
) -> Result<(T, u32), LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut n = 0;
    loop {
        n += 1;
        let err = match attempt().await {
            Ok(value) => return Ok((value, n)),
            Err(err) => err,
        };
        if !err.is_retryable() || n >= max_attempts {
            return Err(err);
        }
        let delay = policy.delay_for(n);
        warn!(
            provider,
            attempt = n,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Upstream connection failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Open a completion stream, retrying until the first chunk arrives.
///
/// Waiting longer than `first_chunk_timeout` for the first item counts as
/// `UpstreamUnavailable`. The first item is re-attached to the front of the
/// returned stream, so the caller sees the full sequence.
pub async fn connect_with_retry(
    provider: &BoxCompletionProvider,
    request: &CompletionRequest,
    policy: &RetryPolicy,
    first_chunk_timeout: Duration,
) -> Result<Connected, LlmError> {
    let (stream, attempts) = retry_connection(policy, provider.name(), || {
        let mut upstream = provider.stream(request.clone());
        async move {
            match tokio::time::timeout(first_chunk_timeout, upstream.next()).await {
                Ok(Some(Ok(first))) => {
                    let joined: ChunkStream =
                        Box::pin(stream::once(async move { Ok(first) }).chain(upstream));
                    Ok(joined)
                }
                Ok(Some(Err(err))) => Err(err),
                Ok(None) => {
                    let empty: ChunkStream = Box::pin(stream::empty());
                    Ok(empty)
                }
                Err(_) => Err(LlmError::UpstreamUnavailable(format!(
                    "no response within {:.1}s",
                    first_chunk_timeout.as_secs_f64()
                ))),
            }
        }
    })
    .await?;

    Ok(Connected { stream, attempts })
}

/// Non-streaming variant: the whole response must arrive within `timeout`.
pub async fn complete_with_retry(
    provider: &BoxCompletionProvider,
    request: &CompletionRequest,
    policy: &RetryPolicy,
    timeout: Duration,
) -> Result<CompletionResponse, LlmError> {
    let (response, _) = retry_connection(policy, provider.name(), || async move {
        tokio::time::timeout(timeout, provider.complete(request))
            .await
            .map_err(|_| {
                LlmError::UpstreamUnavailable(format!(
                    "no response within {:.1}s",
                    timeout.as_secs_f64()
                ))
            })?
    })
    .await?;

    Ok(response)
}
