//! Shared domain types for MaoFlow.
//!
//! This crate contains the core domain types used across the MaoFlow backend:
//! conversations, messages, content blocks, model configurations, users,
//! streaming frames, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod model;
pub mod stream;
pub mod user;
