//! Domain layer types and invariants.

pub mod analytics;
pub mod content;
pub mod error;
pub mod session;
pub mod slug;
