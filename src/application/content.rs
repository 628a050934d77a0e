//! Loading and validating the content directory.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    application::error::AppError,
    domain::{
        content::{Collection, EntryData},
        slug::entry_slug,
    },
};

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "mdx"];
const FENCE: &str = "---";

/// One validated document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentEntry {
    pub collection: Collection,
    pub slug: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub data: EntryData,
    /// Full document source, front matter included.
    #[serde(skip)]
    pub source: String,
}

/// A document that failed to load or validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentError {
    pub path: PathBuf,
    pub message: String,
}

impl ContentError {
    fn new(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

#[derive(Debug, Default)]
pub struct LoadedContent {
    pub entries: Vec<ContentEntry>,
    pub errors: Vec<ContentError>,
}

impl LoadedContent {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn in_collection(&self, collection: Collection) -> impl Iterator<Item = &ContentEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.collection == collection)
    }
}

/// Reads `<root>/<collection>/**/*.md{,x}` for every collection.
#[derive(Debug, Clone)]
pub struct ContentLoader {
    root: PathBuf,
}

impl ContentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every collection. Per-document problems are collected rather than
    /// aborting; only an unreadable root is an error.
    pub fn load(&self) -> Result<LoadedContent, AppError> {
        if !self.root.is_dir() {
            return Err(AppError::validation(format!(
                "content root `{}` is not a directory",
                self.root.display()
            )));
        }

        let mut loaded = LoadedContent::default();
        for collection in Collection::ALL {
            self.load_collection(collection, &mut loaded);
        }

        loaded
            .entries
            .sort_by(|a, b| (a.collection, &a.slug).cmp(&(b.collection, &b.slug)));
        loaded.errors.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            target = "quaderno::content",
            root = %self.root.display(),
            entries = loaded.entries.len(),
            errors = loaded.errors.len(),
            "Content loaded"
        );
        Ok(loaded)
    }

    fn load_collection(&self, collection: Collection, loaded: &mut LoadedContent) {
        let dir = self.root.join(collection.as_str());
        if !dir.is_dir() {
            debug!(
                target = "quaderno::content",
                collection = collection.as_str(),
                "Collection directory missing; treating as empty"
            );
            return;
        }

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for item in WalkDir::new(&dir).sort_by_file_name() {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    let path = err.path().unwrap_or(&dir).to_path_buf();
                    loaded.errors.push(ContentError::new(&path, err.to_string()));
                    continue;
                }
            };
            if !item.file_type().is_file() || !is_markdown(item.path()) {
                continue;
            }

            let entry = match load_entry(collection, &dir, item.path()) {
                Ok(entry) => entry,
                Err(err) => {
                    loaded.errors.push(err);
                    continue;
                }
            };

            // Two files may slugify alike; the first in walk order keeps the slug.
            if let Some(first) = seen.get(&entry.slug) {
                loaded.errors.push(ContentError::new(
                    &entry.path,
                    format!(
                        "slug `{}` is already used by {}",
                        entry.slug,
                        first.display()
                    ),
                ));
                continue;
            }

            for warning in entry.data.warnings() {
                warn!(
                    target = "quaderno::content",
                    path = %entry.path.display(),
                    warning = %warning,
                    "Suspicious front matter"
                );
            }
            seen.insert(entry.slug.clone(), entry.path.clone());
            loaded.entries.push(entry);
        }
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn load_entry(collection: Collection, dir: &Path, path: &Path) -> Result<ContentEntry, ContentError> {
    let source =
        std::fs::read_to_string(path).map_err(|err| ContentError::new(path, err.to_string()))?;
    let (front_matter, _body) = split_front_matter(&source)
        .ok_or_else(|| ContentError::new(path, "missing `---` front matter block"))?;

    let data = collection
        .parse_front_matter(front_matter)
        .map_err(|err| ContentError::new(path, err.to_string()))?;

    let relative = path.strip_prefix(dir).unwrap_or(path);
    let slug = entry_slug(relative).map_err(|err| ContentError::new(path, err.to_string()))?;

    Ok(ContentEntry {
        collection,
        slug,
        path: path.to_path_buf(),
        data,
        source,
    })
}

/// Split a document into its YAML front matter and the markdown body.
///
/// The opening fence must be the first line; the block ends at the next line
/// consisting of `---` alone.
pub fn split_front_matter(source: &str) -> Option<(&str, &str)> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let first_line_end = source.find('\n')?;
    if source[..first_line_end].trim_end() != FENCE {
        return None;
    }

    let yaml_start = first_line_end + 1;
    let mut offset = yaml_start;
    for line in source[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let yaml = &source[yaml_start..offset];
            let body = &source[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}
