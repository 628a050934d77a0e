use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use syntect::parsing::SyntaxSet;
use tracing::warn;

use crate::application::render::types::RenderError;

use super::{highlight, math};

#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) contains_code: bool,
    pub(crate) contains_math: bool,
    pub(crate) front_matter: Option<String>,
}

/// Replace code blocks and math nodes with rendered HTML and capture the front matter.
pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    document: &str,
) -> Result<RewriteOutcome, RenderError> {
    let mut walker = RewriteWalker {
        syntax_set,
        document,
        outcome: RewriteOutcome::default(),
    };
    walker.visit_nodes(root)?;
    Ok(walker.outcome)
}

struct RewriteWalker<'a> {
    syntax_set: &'a SyntaxSet,
    document: &'a str,
    outcome: RewriteOutcome,
}

impl RewriteWalker<'_> {
    fn visit_nodes(&mut self, node: &AstNode<'_>) -> Result<(), RenderError> {
        if let Some(raw) = extract_front_matter(node) {
            self.outcome.front_matter = Some(strip_fences(&raw));
        } else if self.handle_math_node(node) {
            // Math nodes have no children worth visiting.
        } else if let Some((info, literal)) = extract_code_block(node) {
            let language = info.split_whitespace().next();
            let html = highlight::highlight_code(language, &literal, self.syntax_set)?;
            self.outcome.contains_code = true;
            node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next)?;
            child = next.next_sibling();
        }

        Ok(())
    }

    fn handle_math_node(&mut self, node: &AstNode<'_>) -> bool {
        let math_data = {
            let data = node.data.borrow();
            if let NodeValue::Math(math_node) = &data.value {
                Some((math_node.literal.clone(), math_node.display_math))
            } else {
                None
            }
        };

        let Some((literal, display_mode)) = math_data else {
            return false;
        };

        self.outcome.contains_math = true;
        let html = match math::render_math_html(&literal, display_mode) {
            Ok(html) if display_mode => {
                format!("<div data-role=\"math-block\" data-math-style=\"display\">{html}</div>")
            }
            Ok(html) => {
                format!("<span data-role=\"math-inline\" data-math-style=\"inline\">{html}</span>")
            }
            Err(err) => {
                warn!(
                    target = "quaderno::render::math",
                    document = self.document,
                    error = %err,
                    "KaTeX rendering failed"
                );
                let style = if display_mode { "display" } else { "inline" };
                format!(
                    "<code data-math-style=\"{style}\">{}</code>",
                    highlight::escape_html(&literal)
                )
            }
        };

        let mut data = node.data.borrow_mut();
        data.value = if display_mode {
            NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            })
        } else {
            NodeValue::HtmlInline(html)
        };
        true
    }
}

fn extract_front_matter(node: &AstNode<'_>) -> Option<String> {
    match &node.data.borrow().value {
        NodeValue::FrontMatter(raw) => Some(raw.to_string()),
        _ => None,
    }
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.to_string()))
    } else {
        None
    }
}

/// Drop the `---` delimiter lines around a front matter block.
pub(crate) fn strip_fences(raw: &str) -> String {
    let body = raw.trim_start_matches('\u{feff}');
    let mut lines = body.lines().skip_while(|line| line.trim().is_empty());
    let mut kept = Vec::new();
    if lines.next().map(str::trim) != Some("---") {
        return body.trim().to_string();
    }
    for line in lines {
        if line.trim() == "---" {
            break;
        }
        kept.push(line);
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_delimiters() {
        assert_eq!(strip_fences("---\ntitle: A\ntags: [x]\n---\n\n"), "title: A\ntags: [x]");
        assert_eq!(strip_fences("---\n---\n"), "");
    }
}
