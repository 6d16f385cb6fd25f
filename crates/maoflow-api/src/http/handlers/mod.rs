//! REST API request handlers.

pub mod chat;
pub mod conversation;
pub mod message;
pub mod model;
pub mod user;
