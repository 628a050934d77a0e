//! Slug helpers for wikilink targets and content entries.
//!
//! Wikilink slugs follow the notebook's historical URL scheme exactly
//! (lowercase, whitespace runs to a single hyphen, everything outside
//! `[a-z0-9-]` dropped) so existing links keep resolving. Entry slugs are
//! derived from file paths with the `slug` crate.

use std::path::{Component, Path};

use slug::slugify;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("entry path `{path}` has no usable file name")]
    EmptyPath { path: String },
}

/// Normalise a wikilink target into the slug used in its URL.
///
/// The result may be empty when the target holds no representable
/// characters; callers keep the link regardless.
pub fn wikilink_slug(target: &str) -> String {
    let lowered = target.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut in_whitespace = false;

    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;

        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            slug.push(ch);
        }
    }

    slug
}

/// Derive an entry slug from a document path relative to its collection.
///
/// Every directory segment and the file stem are slugified separately and
/// joined with `/`, so `2024/My First Post.md` becomes `2024/my-first-post`.
pub fn entry_slug(relative: &Path) -> Result<String, SlugError> {
    let stem_path = relative.with_extension("");
    let segments: Vec<String> = stem_path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str().map(slugify),
            _ => None,
        })
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.is_empty() {
        return Err(SlugError::EmptyPath {
            path: relative.display().to_string(),
        });
    }

    Ok(segments.join("/"))
}
