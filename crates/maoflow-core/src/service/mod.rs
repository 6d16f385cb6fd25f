//! Business logic services (use cases).
//!
//! Services orchestrate repository calls and business rules for the CRUD
//! surfaces around the chat pipeline. They depend on traits (ports) --
//! never on concrete infrastructure implementations.

pub mod conversation;
pub mod model;
pub mod user;
