//! Static build of the content collections.
//!
//! Output layout under the build directory:
//! `<collection>/<slug>.html` holds the rendered body of each entry,
//! `<collection>.json` lists the collection newest first and `syntax.css`
//! carries the highlighting theme.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;
use tracing::info;

use crate::{
    application::{
        content::{ContentEntry, ContentLoader},
        error::AppError,
        render::{ComrakRenderService, RenderRequest, RenderService, WikiLink},
    },
    domain::content::{Collection, EntryData},
};

pub const SYNTAX_STYLESHEET: &str = "syntax.css";

#[derive(Debug, Clone, Serialize)]
struct IndexItem<'a> {
    slug: &'a str,
    data: &'a EntryData,
    wikilinks: Vec<WikiLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub out_dir: PathBuf,
    pub collections: Vec<(Collection, usize)>,
    pub wikilinks: usize,
}

impl BuildReport {
    pub fn entries(&self) -> usize {
        self.collections.iter().map(|(_, count)| count).sum()
    }
}

pub struct SiteBuilder {
    loader: ContentLoader,
    renderer: Arc<ComrakRenderService>,
}

impl SiteBuilder {
    pub fn new(loader: ContentLoader, renderer: Arc<ComrakRenderService>) -> Self {
        Self { loader, renderer }
    }

    /// Validate every collection and write the site into `out_dir`.
    ///
    /// Nothing is written when any document fails validation or the syntax
    /// theme is unknown.
    pub fn build(&self, out_dir: &Path) -> Result<BuildReport, AppError> {
        let loaded = self.loader.load()?;
        if !loaded.is_valid() {
            let details: Vec<String> = loaded.errors.iter().map(ToString::to_string).collect();
            return Err(AppError::validation(format!(
                "{} invalid document(s): {}",
                loaded.errors.len(),
                details.join("; ")
            )));
        }

        let stylesheet = self.renderer.syntax_stylesheet()?;
        fs::create_dir_all(out_dir)?;

        let mut report = BuildReport {
            out_dir: out_dir.to_path_buf(),
            collections: Vec::new(),
            wikilinks: 0,
        };

        for collection in Collection::ALL {
            let mut entries: Vec<&ContentEntry> = loaded.in_collection(collection).collect();
            // Stable: equal dates keep slug order.
            entries.sort_by(|a, b| b.data.sort_date().cmp(&a.data.sort_date()));

            let mut index = Vec::with_capacity(entries.len());
            for entry in &entries {
                let wikilinks = self.write_entry(out_dir, entry)?;
                report.wikilinks += wikilinks.len();
                index.push(IndexItem {
                    slug: &entry.slug,
                    data: &entry.data,
                    wikilinks,
                });
            }

            let encoded = serde_json::to_string_pretty(&index).map_err(|err| {
                AppError::unexpected(format!("failed to encode {collection} index: {err}"))
            })?;
            fs::write(out_dir.join(format!("{collection}.json")), encoded)?;
            report.collections.push((collection, entries.len()));
        }

        fs::write(out_dir.join(SYNTAX_STYLESHEET), stylesheet)?;

        info!(
            target = "quaderno::site",
            out_dir = %out_dir.display(),
            entries = report.entries(),
            wikilinks = report.wikilinks,
            "Site built"
        );
        Ok(report)
    }

    fn write_entry(&self, out_dir: &Path, entry: &ContentEntry) -> Result<Vec<WikiLink>, AppError> {
        let request = RenderRequest::new(entry.source.as_str()).with_source_path(entry.path.clone());
        let output = self.renderer.render(&request)?;

        let target = out_dir
            .join(entry.collection.as_str())
            .join(format!("{}.html", entry.slug));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, output.html)?;
        Ok(output.wikilinks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::{RenderError, RenderPipelineConfig};

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, contents).expect("write file");
    }

    fn builder(root: &Path) -> SiteBuilder {
        SiteBuilder::new(
            ContentLoader::new(root),
            Arc::new(ComrakRenderService::default()),
        )
    }

    #[test]
    fn builds_html_indexes_and_stylesheet() {
        let content = tempfile::tempdir().expect("content dir");
        let out = tempfile::tempdir().expect("out dir");
        write(
            content.path(),
            "notes/older.md",
            "---\ntitle: Older\ndate: 2023-01-01\n---\nSee [[Newer Note]].\n",
        );
        write(
            content.path(),
            "notes/newer.md",
            "---\ntitle: Newer\ndate: 2024-01-01\n---\n# Newer\n",
        );

        let report = builder(content.path()).build(out.path()).expect("build");
        assert_eq!(report.entries(), 2);
        assert_eq!(report.wikilinks, 1);

        let html = fs::read_to_string(out.path().join("notes/older.html")).expect("html");
        assert!(html.contains(r#"<a href="/notes/newer-note">Newer Note</a>"#), "{html}");

        let index: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(out.path().join("notes.json")).expect("index"),
        )
        .expect("json");
        assert_eq!(index[0]["slug"], "newer");
        assert_eq!(index[0]["data"]["date"], "2024-01-01");
        assert_eq!(index[1]["wikilinks"][0]["url"], "/notes/newer-note");

        let empty: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(out.path().join("career.json")).expect("career index"),
        )
        .expect("json");
        assert_eq!(empty, serde_json::json!([]));

        assert!(out.path().join(SYNTAX_STYLESHEET).is_file());
    }

    #[test]
    fn invalid_content_writes_nothing() {
        let content = tempfile::tempdir().expect("content dir");
        let out = tempfile::tempdir().expect("out dir");
        write(content.path(), "coding/broken.md", "---\ntitle: Missing fields\n---\n");

        let err = builder(content.path())
            .build(&out.path().join("site"))
            .expect_err("invalid content");
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!out.path().join("site").exists());
    }

    #[test]
    fn unknown_theme_writes_nothing() {
        let content = tempfile::tempdir().expect("content dir");
        let out = tempfile::tempdir().expect("out dir");
        write(
            content.path(),
            "notes/entry.md",
            "---\ntitle: Entry\ndate: 2024-01-01\n---\nBody\n",
        );

        let renderer = ComrakRenderService::with_config(RenderPipelineConfig {
            theme: "no-such-theme".to_string(),
            ..RenderPipelineConfig::default()
        });
        let err = SiteBuilder::new(ContentLoader::new(content.path()), Arc::new(renderer))
            .build(&out.path().join("site"))
            .expect_err("unknown theme");

        assert!(matches!(err, AppError::Render(RenderError::UnknownTheme { .. })));
        assert!(!out.path().join("site").exists());
    }

    #[test]
    fn colliding_slugs_fail_the_build() {
        let content = tempfile::tempdir().expect("content dir");
        let out = tempfile::tempdir().expect("out dir");
        write(
            content.path(),
            "notes/My Post.md",
            "---\ntitle: First\ndate: 2024-01-01\n---\nfirst body\n",
        );
        write(
            content.path(),
            "notes/my-post.md",
            "---\ntitle: Second\ndate: 2024-02-01\n---\nsecond body\n",
        );

        let err = builder(content.path())
            .build(&out.path().join("site"))
            .expect_err("duplicate slug");
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!out.path().join("site").exists());
    }
}
