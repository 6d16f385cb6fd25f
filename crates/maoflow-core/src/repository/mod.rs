//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (maoflow-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod conversation;
pub mod model;
pub mod user;

/// Offset pagination for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}
