//! Upstream completion abstractions for MaoFlow.
//!
//! - `CompletionProvider`: RPITIT trait for concrete upstream clients
//! - `BoxCompletionProvider`: object-safe wrapper for dynamic dispatch
//! - `ProviderFactory`: builds a provider from a per-turn model snapshot
//! - `retry`: bounded backoff around the connection phase

pub mod box_provider;
pub mod factory;
pub mod provider;
pub mod retry;
