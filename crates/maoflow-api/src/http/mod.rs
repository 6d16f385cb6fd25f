//! HTTP/REST API layer for MaoFlow.
//!
//! Axum-based REST API at `/api/v1/` with envelope responses, SSE chat
//! streaming, and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
