//! The streaming chat pipeline.
//!
//! One user query flows through: `ChatService::start_turn` (validation and
//! the two synchronous message writes) -> `TurnOrchestrator` (retrying
//! connect, demultiplexing, aggregation, forwarding) -> finalize under a
//! per-conversation lock.

pub mod aggregator;
pub mod demux;
pub mod locks;
pub mod service;
pub mod tokens;
pub mod turn;
