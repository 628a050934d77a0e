mod config;
mod highlight;
mod math;
mod rewrite;
mod wikilinks;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use once_cell::sync::{Lazy, OnceCell};
use syntect::parsing::SyntaxSet;
use thiserror::Error;

use crate::application::render::types::{
    RenderError, RenderOutput, RenderRequest, RenderService,
};

use config::default_options;
use rewrite::rewrite_ast;
use wikilinks::rewrite_wikilinks;

pub use wikilinks::{WikilinkRoute, WikilinkRouting};

pub const DEFAULT_SYNTAX_THEME: &str = "base16-ocean.dark";

/// Comrak-based rendering pipeline with KaTeX math, Syntect highlighting and wikilinks.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    syntax_set: SyntaxSet,
    config: RenderPipelineConfig,
}

impl ComrakRenderService {
    /// Construct a renderer with GFM, math and front matter enabled and code
    /// highlighting configured to emit `syntax-` prefixed CSS classes.
    pub fn with_config(config: RenderPipelineConfig) -> Self {
        Self {
            options: default_options(),
            syntax_set: SyntaxSet::load_defaults_newlines(),
            config,
        }
    }

    pub fn config(&self) -> &RenderPipelineConfig {
        &self.config
    }

    /// CSS for the configured syntax theme.
    pub fn syntax_stylesheet(&self) -> Result<String, RenderError> {
        highlight::stylesheet(&self.config.theme)
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::with_config(active_render_config())));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::with_config(RenderPipelineConfig::default())
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);

        let document = request
            .source_path()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        let rewrite_outcome = rewrite_ast(root, &self.syntax_set, &document)?;

        let base = self.config.wikilinks.base_for(request.source_path());
        let wikilinks = rewrite_wikilinks(&arena, root, base);

        let html = render_html_stage(root, &self.options)?;

        Ok(RenderOutput {
            html,
            front_matter: rewrite_outcome.front_matter,
            contains_code: rewrite_outcome.contains_code,
            contains_math: rewrite_outcome.contains_math,
            wikilinks,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipelineConfig {
    pub wikilinks: WikilinkRouting,
    pub theme: String,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            wikilinks: WikilinkRouting::default(),
            theme: DEFAULT_SYNTAX_THEME.to_string(),
        }
    }
}

impl From<&crate::config::RenderSettings> for RenderPipelineConfig {
    fn from(settings: &crate::config::RenderSettings) -> Self {
        Self {
            wikilinks: WikilinkRouting {
                default_base: settings.default_base.clone(),
                routes: settings.routes.clone(),
            },
            theme: settings.theme.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_PIPELINE_CONFIG: OnceCell<RenderPipelineConfig> = OnceCell::new();

pub fn configure_render_service(config: RenderPipelineConfig) -> Result<(), RenderConfigError> {
    RENDER_PIPELINE_CONFIG
        .set(config)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

fn active_render_config() -> RenderPipelineConfig {
    RENDER_PIPELINE_CONFIG.get().cloned().unwrap_or_default()
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> RenderOutput {
        ComrakRenderService::default()
            .render(&RenderRequest::new(markdown))
            .expect("render")
    }

    #[test]
    fn captures_front_matter_and_renders_body() {
        let output = render("---\ntitle: Hello\n---\n\n# Heading\n\nBody text.\n");
        assert_eq!(output.front_matter.as_deref(), Some("title: Hello"));
        assert!(output.html.contains("<h1>Heading</h1>"), "{}", output.html);
        assert!(!output.html.contains("title: Hello"));
    }

    #[test]
    fn gfm_extensions_are_enabled() {
        let output = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done\n");
        assert!(output.html.contains("<table>"), "{}", output.html);
        assert!(output.html.contains("<del>gone</del>"));
        assert!(output.html.contains("checkbox"));
    }

    #[test]
    fn code_blocks_are_highlighted() {
        let output = render("```rust\nlet x = 1;\n```\n");
        assert!(output.contains_code);
        assert!(output.html.contains("syntax-highlight"), "{}", output.html);
    }

    #[test]
    fn math_is_rendered_with_katex() {
        let output = render("Inline $x^2$ and\n\n$$\\sum_i i$$\n");
        assert!(output.contains_math);
        assert!(output.html.contains("data-math-style=\"inline\""));
        assert!(output.html.contains("katex"), "{}", output.html);
    }

    #[test]
    fn invalid_math_degrades_to_code() {
        let output = render("Broken $\\frac{$ math\n");
        assert!(output.contains_math);
        assert!(output.html.contains("<code data-math-style=\"inline\">"), "{}", output.html);
    }

    #[test]
    fn wikilinks_follow_source_path() {
        let service = ComrakRenderService::default();
        let request = RenderRequest::new("See [[Stack Frames]].\n")
            .with_source_path("content/notes/reverse-engineering/calls.md");
        let output = service.render(&request).expect("render");

        assert_eq!(output.wikilinks.len(), 1);
        assert_eq!(
            output.wikilinks[0].url,
            "/learning/reverse-engineering/stack-frames"
        );
        assert!(output
            .html
            .contains(r#"<a href="/learning/reverse-engineering/stack-frames">Stack Frames</a>"#));
    }
}
