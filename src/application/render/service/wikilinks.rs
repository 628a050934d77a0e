//! `[[target]]` and `[[target|label]]` rewriting.
//!
//! The pass walks every text node once, coalescing adjacent text siblings
//! and soft line breaks first so that brackets the markdown parser split
//! apart are scanned as one run. Code spans and code blocks are not text
//! nodes and stay untouched.
//! Nodes created by the pass are never rescanned.

use std::path::Path;

use comrak::{
    Arena,
    nodes::{AstNode, NodeLink, NodeValue},
};
use serde::Deserialize;

use crate::application::render::types::WikiLink;
use crate::domain::slug::wikilink_slug;

pub const DEFAULT_WIKILINK_BASE: &str = "/notes";

/// Sends documents whose path contains `marker` to `base`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WikilinkRoute {
    pub marker: String,
    pub base: String,
}

impl WikilinkRoute {
    pub fn new(marker: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            base: base.into(),
        }
    }
}

/// Ordered base-path rules; the first rule whose marker occurs in the source
/// path wins, otherwise `default_base` applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikilinkRouting {
    pub default_base: String,
    pub routes: Vec<WikilinkRoute>,
}

impl Default for WikilinkRouting {
    fn default() -> Self {
        Self {
            default_base: DEFAULT_WIKILINK_BASE.to_string(),
            routes: vec![WikilinkRoute::new(
                "reverse-engineering",
                "/learning/reverse-engineering",
            )],
        }
    }
}

impl WikilinkRouting {
    /// Every link resolves under `base`, whatever the source path.
    pub fn fixed(base: impl Into<String>) -> Self {
        Self {
            default_base: base.into(),
            routes: Vec::new(),
        }
    }

    pub fn base_for(&self, source_path: Option<&Path>) -> &str {
        let Some(path) = source_path else {
            return &self.default_base;
        };
        let path = path.to_string_lossy();
        self.routes
            .iter()
            .find(|route| path.contains(route.marker.as_str()))
            .map(|route| route.base.as_str())
            .unwrap_or(&self.default_base)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WikilinkSegment<'t> {
    Text(&'t str),
    Link {
        target: &'t str,
        label: Option<&'t str>,
    },
}

/// Split `text` into literal runs and wikilinks, leftmost match first.
pub(crate) fn split_wikilinks(text: &str) -> Vec<WikilinkSegment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find("[[") {
        let start = cursor + offset;
        match match_at(text, start) {
            Some((target, label, end)) => {
                if literal_start < start {
                    segments.push(WikilinkSegment::Text(&text[literal_start..start]));
                }
                segments.push(WikilinkSegment::Link { target, label });
                literal_start = end;
                cursor = end;
            }
            // `[` is one byte, so the next char boundary is right after it.
            None => cursor = start + 1,
        }
    }

    if literal_start < text.len() {
        segments.push(WikilinkSegment::Text(&text[literal_start..]));
    }
    segments
}

/// Match `[[target]]` or `[[target|label]]` starting at `start`, returning the
/// captures and the byte offset just past the closing brackets.
fn match_at(text: &str, start: usize) -> Option<(&str, Option<&str>, usize)> {
    let body_start = start + 2;
    let body = &text[body_start..];

    let target_len = body.find([']', '|']).unwrap_or(body.len());
    if target_len == 0 {
        return None;
    }
    let target = &body[..target_len];
    let rest = &body[target_len..];

    if let Some(label_part) = rest.strip_prefix('|') {
        let label_len = label_part.find(']').unwrap_or(label_part.len());
        if label_len == 0 || !label_part[label_len..].starts_with("]]") {
            return None;
        }
        let end = body_start + target_len + 1 + label_len + 2;
        return Some((target, Some(&label_part[..label_len]), end));
    }

    rest.starts_with("]]")
        .then_some((target, None, body_start + target_len + 2))
}

fn resolve(target: &str, label: Option<&str>, base: &str) -> WikiLink {
    let slug = wikilink_slug(target);
    WikiLink {
        target: target.to_string(),
        url: format!("{base}/{slug}"),
        slug,
        label: label.unwrap_or(target).to_string(),
    }
}

/// Rewrite every text node under `root`, returning the produced links.
pub(crate) fn rewrite_wikilinks<'a>(
    arena: &'a Arena<'a>,
    root: &'a AstNode<'a>,
    base: &str,
) -> Vec<WikiLink> {
    let text_nodes: Vec<&'a AstNode<'a>> = root
        .descendants()
        .filter(|node| text_of(node).is_some())
        .collect();

    let mut produced = Vec::new();
    for node in text_nodes {
        // Already merged into a preceding sibling.
        if node.parent().is_none() {
            continue;
        }
        coalesce_following_text(node);
        let Some(text) = text_of(node) else {
            continue;
        };
        if !text.contains("[[") {
            continue;
        }

        let segments = split_wikilinks(&text);
        if !segments
            .iter()
            .any(|segment| matches!(segment, WikilinkSegment::Link { .. }))
        {
            continue;
        }

        for segment in segments {
            let replacement = match segment {
                WikilinkSegment::Text(literal) => new_text(arena, literal),
                WikilinkSegment::Link { target, label } => {
                    let link = resolve(target, label, base);
                    let anchor: &'a AstNode<'a> =
                        arena.alloc(AstNode::from(NodeValue::Link(Box::new(NodeLink {
                            url: link.url.clone(),
                            title: String::new(),
                        }))));
                    anchor.append(new_text(arena, &link.label));
                    produced.push(link);
                    anchor
                }
            };
            node.insert_before(replacement);
        }
        node.detach();
    }

    produced
}

fn text_of(node: &AstNode<'_>) -> Option<String> {
    match &node.data.borrow().value {
        NodeValue::Text(text) => Some(text.to_string()),
        _ => None,
    }
}

fn new_text<'a>(arena: &'a Arena<'a>, text: &str) -> &'a AstNode<'a> {
    arena.alloc(AstNode::from(NodeValue::Text(text.to_string().into())))
}

fn coalesce_following_text(node: &AstNode<'_>) {
    let Some(mut merged) = text_of(node) else {
        return;
    };
    let mut absorbed = false;
    while let Some(next) = node.next_sibling() {
        let Some(text) = run_text_of(next) else {
            break;
        };
        merged.push_str(&text);
        next.detach();
        absorbed = true;
    }
    if absorbed {
        node.data.borrow_mut().value = NodeValue::Text(merged.into());
    }
}

/// Text that continues the current run; a soft line break reads as `\n`.
fn run_text_of(node: &AstNode<'_>) -> Option<String> {
    if matches!(node.data.borrow().value, NodeValue::SoftBreak) {
        return Some("\n".to_string());
    }
    text_of(node)
}
