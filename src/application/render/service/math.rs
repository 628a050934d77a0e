use katex::{OptsBuilder, OutputType};

use crate::application::render::types::RenderError;

/// Render a KaTeX expression to HTML, returning an inline (`<span>`) or block (`<span class="katex-display">`) fragment.
pub(crate) fn render_math_html(literal: &str, display_mode: bool) -> Result<String, RenderError> {
    let mut builder = OptsBuilder::default();
    builder.display_mode(display_mode);
    builder.output_type(OutputType::Html);

    let opts = builder.build().map_err(|err| RenderError::Math {
        message: format!("failed to build KaTeX options: {err}"),
    })?;

    katex::render_with_opts(literal, opts).map_err(|err| RenderError::Math {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_inline_and_display_math() {
        let inline = render_math_html("x^2", false).expect("inline math");
        assert!(inline.contains("katex"), "{inline}");
        assert!(!inline.contains("katex-display"));

        let display = render_math_html(r"\frac{a}{b}", true).expect("display math");
        assert!(display.contains("katex-display"), "{display}");
    }

    #[test]
    fn invalid_expression_is_an_error() {
        let err = render_math_html(r"\frac{", false).expect_err("unbalanced braces");
        assert!(matches!(err, RenderError::Math { .. }));
    }
}
