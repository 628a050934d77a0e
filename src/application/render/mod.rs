//! Markdown rendering pipeline.
//!
//! The pipeline is pure: it accepts markdown input, produces deterministic
//! HTML output and surfaces structured errors. Writing the results anywhere
//! is the caller's job.

mod service;
mod types;

pub use service::{
    ComrakRenderService, DEFAULT_SYNTAX_THEME, RenderConfigError, RenderPipelineConfig,
    WikilinkRoute, WikilinkRouting, configure_render_service, render_service,
};
pub use types::{RenderError, RenderOutput, RenderRequest, RenderService, WikiLink};
