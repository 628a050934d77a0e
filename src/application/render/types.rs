use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Path of the source document; selects the wikilink base path.
    pub source_path: Option<PathBuf>,
    /// Markdown source, front matter included.
    pub markdown: String,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            source_path: None,
            markdown: markdown.into(),
        }
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }
}

/// A `[[wikilink]]` rewritten into a hyperlink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WikiLink {
    /// Link text as written between the brackets.
    pub target: String,
    pub slug: String,
    pub url: String,
    /// Visible text: the display text when given, else the target.
    pub label: String,
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub html: String,
    /// YAML between the `---` fences, when the document has front matter.
    pub front_matter: Option<String>,
    /// Indicates whether the rendered HTML contains any highlighted code blocks.
    pub contains_code: bool,
    /// Indicates whether the rendered HTML contains math fragments.
    pub contains_math: bool,
    /// Wikilinks produced by the rewrite, in document order.
    pub wikilinks: Vec<WikiLink>,
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("math rendering failed: {message}")]
    Math { message: String },
    #[error("unknown syntax theme `{theme}`")]
    UnknownTheme { theme: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
