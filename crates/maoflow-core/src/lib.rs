//! Chat pipeline and repository trait definitions for MaoFlow.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the streaming pipeline that drives
//! one chat turn. It depends only on `maoflow-types` -- never on
//! `maoflow-infra` or any database/IO crate.

pub mod chat;
pub mod llm;
pub mod repository;
pub mod service;

#[cfg(test)]
mod test_support;
