//! Infrastructure layer for MaoFlow.
//!
//! Implements the ports defined in `maoflow-core`: SQLite storage for
//! users, models and conversations, and the OpenAI-compatible upstream
//! client. Also loads the global configuration file.

pub mod config;
pub mod llm;
pub mod sqlite;
