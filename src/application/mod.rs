//! Application services: content loading, rendering, the static build and analytics.

pub mod analytics;
pub mod content;
pub mod error;
pub mod render;
pub mod site;
