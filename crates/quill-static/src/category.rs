//! Per-category rendering.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;

use quill_content::{derive_slug, resolve_title, MarkdownRenderer, SourceFormat};

use crate::builder::{BuildFailure, BuildMode};
use crate::layout::Layout;
use crate::staleness::needs_rebuild;
use crate::storage::{DirEntry, Storage};

/// File name reserved for a category's own index page.
pub const INDEX_FILE: &str = "index.html";

/// Slug that would overwrite the category index.
const RESERVED_SLUG: &str = "index";

/// A post resolved for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPost {
    /// Display title
    pub title: String,

    /// Output filename stem
    pub slug: String,

    /// Source document path
    pub source_path: PathBuf,

    /// Output page path, inside the category output directory
    pub output_path: PathBuf,
}

/// A category and the posts it published this run, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Directory name, also the URL segment and navigation label
    pub name: String,

    /// Posts in listing order
    pub posts: Vec<RenderedPost>,
}

/// Counts reported for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySummary {
    /// Category name
    pub name: String,

    /// Posts written this run
    pub rendered: usize,

    /// Posts left untouched because their output was up to date
    pub skipped: usize,

    /// Documents that could not be read or written
    pub failed: usize,

    /// Whether the category index page was written
    pub index_written: bool,
}

/// Everything produced by rendering one category.
#[derive(Debug, Clone)]
pub struct CategoryRender {
    /// The resolved category
    pub category: Category,

    /// Counts for the run summary
    pub summary: CategorySummary,

    /// Write failures to report at the end of the run
    pub failures: Vec<BuildFailure>,
}

/// A source document read from a category directory.
#[derive(Debug)]
struct SourceDocument {
    file_name: String,
    path: PathBuf,
    format: SourceFormat,
    content: String,
    modified: SystemTime,
}

/// A document with its title and slug resolved.
#[derive(Debug)]
struct ResolvedDocument {
    source: SourceDocument,
    post: RenderedPost,
    /// Another document later in listing order publishes to the same path
    superseded: bool,
    /// Newest source time among documents sharing this output path
    group_modified: SystemTime,
}

/// Result of processing a single document.
#[derive(Debug)]
enum DocumentOutcome {
    Rendered,
    Skipped,
    Superseded,
    OutOfScope,
    Failed(BuildFailure),
}

/// Renders the posts and index page of a category.
pub struct CategoryRenderer<'a> {
    content_dir: &'a Path,
    output_dir: &'a Path,
    layout: &'a Layout,
    storage: &'a dyn Storage,
    markdown: &'a dyn MarkdownRenderer,
    parallel: bool,
}

impl<'a> CategoryRenderer<'a> {
    /// Create a renderer reading from `content_dir` and writing under `output_dir`.
    pub fn new(
        content_dir: &'a Path,
        output_dir: &'a Path,
        layout: &'a Layout,
        storage: &'a dyn Storage,
        markdown: &'a dyn MarkdownRenderer,
    ) -> Self {
        Self {
            content_dir,
            output_dir,
            layout,
            storage,
            markdown,
            parallel: false,
        }
    }

    /// Render documents of a category in parallel.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Render one category.
    ///
    /// When `only` names a file, every other document is resolved for the
    /// index but only that file's output is written.
    pub fn render_category(
        &self,
        name: &str,
        mode: BuildMode,
        only: Option<&str>,
    ) -> CategoryRender {
        let source_dir = self.content_dir.join(name);
        let category_dir = self.output_dir.join(name);

        let mut summary = CategorySummary {
            name: name.to_string(),
            ..Default::default()
        };
        let mut failures = Vec::new();

        if let Err(e) = self.storage.create_dir_all(&category_dir) {
            tracing::warn!("Failed to create {}: {}", category_dir.display(), e);
            failures.push(BuildFailure::new(&category_dir, e));
        }

        let mut documents = self.resolve_documents(
            name,
            &source_dir,
            &category_dir,
            &mut summary,
            &mut failures,
        );
        group_collisions(name, &mut documents);
        let in_scope = scoped_slugs(&documents, only);

        // Only one document per output path is ever written, so writes never race
        let outcomes: Vec<DocumentOutcome> = if self.parallel {
            documents
                .par_iter()
                .map(|doc| self.process(name, doc, mode, in_scope.as_ref()))
                .collect()
        } else {
            documents
                .iter()
                .map(|doc| self.process(name, doc, mode, in_scope.as_ref()))
                .collect()
        };

        for outcome in outcomes {
            match outcome {
                DocumentOutcome::Rendered => summary.rendered += 1,
                DocumentOutcome::Skipped => summary.skipped += 1,
                DocumentOutcome::Superseded | DocumentOutcome::OutOfScope => {}
                DocumentOutcome::Failed(failure) => {
                    summary.failed += 1;
                    failures.push(failure);
                }
            }
        }

        let posts: Vec<RenderedPost> = documents.into_iter().map(|doc| doc.post).collect();

        let index_path = category_dir.join(INDEX_FILE);
        let index_html = self.layout.category_index(name, &posts);
        match self.storage.write(&index_path, index_html.as_bytes()) {
            Ok(()) => summary.index_written = true,
            Err(e) => {
                tracing::warn!("Failed to write {}: {}", index_path.display(), e);
                failures.push(BuildFailure::new(&index_path, e));
            }
        }

        tracing::info!(
            "{}: {} rendered, {} skipped, {} failed",
            name,
            summary.rendered,
            summary.skipped,
            summary.failed
        );

        CategoryRender {
            category: Category {
                name: name.to_string(),
                posts,
            },
            summary,
            failures,
        }
    }

    /// Read every eligible document and resolve its title and slug.
    fn resolve_documents(
        &self,
        name: &str,
        source_dir: &Path,
        category_dir: &Path,
        summary: &mut CategorySummary,
        failures: &mut Vec<BuildFailure>,
    ) -> Vec<ResolvedDocument> {
        if !self.storage.is_dir(source_dir) {
            tracing::warn!(
                "Category {} has no source directory at {}",
                name,
                source_dir.display()
            );
            return Vec::new();
        }

        let entries = match self.storage.list_dir(source_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to list {}: {}", source_dir.display(), e);
                failures.push(BuildFailure::new(source_dir, e));
                return Vec::new();
            }
        };

        let mut documents = Vec::new();

        for entry in entries.iter().filter(|e| is_eligible(e)) {
            let source = match self.read_document(entry) {
                Ok(Some(source)) => source,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", entry.path.display(), e);
                    summary.failed += 1;
                    continue;
                }
            };

            let title = resolve_title(&source.content, source.format);
            let slug = derive_slug(&title);

            if slug == RESERVED_SLUG {
                tracing::warn!(
                    "{} would publish as {}/{}, skipping",
                    source.path.display(),
                    name,
                    INDEX_FILE
                );
                summary.failed += 1;
                failures.push(BuildFailure {
                    path: source.path.clone(),
                    reason: format!("slug '{slug}' is reserved for the category index"),
                });
                continue;
            }

            let post = RenderedPost {
                title,
                output_path: category_dir.join(format!("{slug}.html")),
                slug,
                source_path: source.path.clone(),
            };

            documents.push(ResolvedDocument {
                group_modified: source.modified,
                source,
                post,
                superseded: false,
            });
        }

        documents
    }

    fn read_document(&self, entry: &DirEntry) -> std::io::Result<Option<SourceDocument>> {
        let content = self.storage.read_to_string(&entry.path)?;
        let Some(modified) = self.storage.modified(&entry.path)? else {
            // removed between listing and reading
            return Ok(None);
        };
        let Some(format) = SourceFormat::detect(&entry.path, &content) else {
            return Ok(None);
        };

        Ok(Some(SourceDocument {
            file_name: entry.name.clone(),
            path: entry.path.clone(),
            format,
            content,
            modified,
        }))
    }

    /// Decide whether a document needs writing, and write it.
    ///
    /// `in_scope` limits writing to the given slugs; `None` means all.
    fn process(
        &self,
        name: &str,
        doc: &ResolvedDocument,
        mode: BuildMode,
        in_scope: Option<&HashSet<String>>,
    ) -> DocumentOutcome {
        if in_scope.is_some_and(|slugs| !slugs.contains(&doc.post.slug)) {
            return DocumentOutcome::OutOfScope;
        }

        if doc.superseded {
            tracing::debug!(
                "{} is superseded by a later document with slug {}",
                doc.source.path.display(),
                doc.post.slug
            );
            return DocumentOutcome::Superseded;
        }

        let output_modified = self
            .storage
            .modified(&doc.post.output_path)
            .unwrap_or_default();

        if !needs_rebuild(doc.group_modified, output_modified, mode.is_force()) {
            tracing::debug!("Up to date: {}", doc.post.output_path.display());
            return DocumentOutcome::Skipped;
        }

        let html = match doc.source.format {
            SourceFormat::Markdown => {
                let body = self.markdown.render(&doc.source.content);
                self.layout.post_page(name, &doc.post.title, &body)
            }
            SourceFormat::HtmlFragment => {
                self.layout
                    .post_page(name, &doc.post.title, &doc.source.content)
            }
            SourceFormat::HtmlDocument => doc.source.content.clone(),
        };

        match self.storage.write(&doc.post.output_path, html.as_bytes()) {
            Ok(()) => {
                tracing::debug!(
                    "Rendered {} -> {}",
                    doc.source.path.display(),
                    doc.post.output_path.display()
                );
                DocumentOutcome::Rendered
            }
            Err(e) => {
                tracing::warn!("Failed to write {}: {}", doc.post.output_path.display(), e);
                DocumentOutcome::Failed(BuildFailure::new(&doc.post.output_path, e))
            }
        }
    }
}

/// Content files other than the reserved index and hidden files.
fn is_eligible(entry: &DirEntry) -> bool {
    !entry.is_dir && is_document_name(&entry.name)
}

/// Check whether a file name can be published as a post.
pub(crate) fn is_document_name(name: &str) -> bool {
    if name.starts_with('.') || name == INDEX_FILE || name.contains(['/', '\\']) {
        return false;
    }

    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(SourceFormat::is_content_extension)
}

/// Resolve documents sharing a slug into one output.
///
/// The last document in listing order is the one written; earlier ones are
/// marked superseded. The group is stale when any member is newer than the
/// shared output, so the result does not depend on the build mode.
fn group_collisions(category: &str, documents: &mut [ResolvedDocument]) {
    let resolved: Vec<(bool, SystemTime)> = {
        let mut last: HashMap<&str, usize> = HashMap::new();
        let mut newest: HashMap<&str, SystemTime> = HashMap::new();

        for (i, doc) in documents.iter().enumerate() {
            let slug = doc.post.slug.as_str();
            if let Some(prev) = last.insert(slug, i) {
                tracing::warn!(
                    "{} and {} both publish as {}/{}.html, keeping the latter",
                    documents[prev].source.path.display(),
                    doc.source.path.display(),
                    category,
                    slug
                );
            }
            newest
                .entry(slug)
                .and_modify(|t| *t = (*t).max(doc.source.modified))
                .or_insert(doc.source.modified);
        }

        documents
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let slug = doc.post.slug.as_str();
                let superseded = last.get(slug).is_some_and(|&winner| winner != i);
                let modified = newest.get(slug).copied().unwrap_or(doc.source.modified);
                (superseded, modified)
            })
            .collect()
    };

    for (doc, (superseded, modified)) in documents.iter_mut().zip(resolved) {
        doc.superseded = superseded;
        doc.group_modified = modified;
    }
}

/// Slugs a document-scoped build may write: the group of the named file.
fn scoped_slugs(documents: &[ResolvedDocument], only: Option<&str>) -> Option<HashSet<String>> {
    let file = only?;
    Some(
        documents
            .iter()
            .filter(|doc| doc.source.file_name == file)
            .map(|doc| doc.post.slug.clone())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;
    use crate::templates::TemplateSet;
    use quill_content::CmarkRenderer;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    struct Site {
        _temp: tempfile::TempDir,
        content: PathBuf,
        output: PathBuf,
        layout: Layout,
    }

    fn site() -> Site {
        let temp = tempdir().unwrap();
        let content = temp.path().join("posts");
        let output = temp.path().join("dist");
        fs::create_dir_all(content.join("algorithm")).unwrap();
        fs::create_dir_all(&output).unwrap();

        Site {
            _temp: temp,
            content,
            output,
            layout: Layout::new(TemplateSet::builtin(), "Notes", vec!["algorithm".to_string()]),
        }
    }

    fn render(site: &Site, mode: BuildMode, only: Option<&str>) -> CategoryRender {
        CategoryRenderer::new(
            &site.content,
            &site.output,
            &site.layout,
            &FsStorage,
            &CmarkRenderer::default(),
        )
        .render_category("algorithm", mode, only)
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn renders_markdown_post_and_index() {
        let site = site();
        fs::write(
            site.content.join("algorithm/bs.md"),
            "# Binary Search\n\ncontent",
        )
        .unwrap();

        let result = render(&site, BuildMode::Force, None);

        assert_eq!(result.summary.rendered, 1);
        assert!(result.summary.index_written);
        let post = &result.category.posts[0];
        assert_eq!(post.slug, "binary-search");
        assert_eq!(post.output_path, site.output.join("algorithm/binary-search.html"));

        let html = fs::read_to_string(&post.output_path).unwrap();
        assert!(html.contains("<h1>Binary Search</h1>"));
        assert!(html.contains("<p>content</p>"));
    }

    #[test]
    fn skips_reserved_index_hidden_and_foreign_files() {
        let site = site();
        let dir = site.content.join("algorithm");
        fs::write(dir.join("index.html"), "<h1>Hand written</h1>").unwrap();
        fs::write(dir.join(".draft.md"), "# Draft").unwrap();
        fs::write(dir.join("notes.txt"), "# Notes").unwrap();
        fs::create_dir(dir.join("images.md")).unwrap();
        fs::write(dir.join("real.md"), "# Real").unwrap();

        let result = render(&site, BuildMode::Force, None);

        let slugs: Vec<_> = result.category.posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["real"]);
    }

    #[test]
    fn html_documents_pass_through_and_fragments_are_wrapped() {
        let site = site();
        let dir = site.content.join("algorithm");
        let document =
            "<!DOCTYPE html><html><head><title>Standalone</title></head><body>raw</body></html>";
        fs::write(dir.join("a.html"), document).unwrap();
        fs::write(dir.join("b.html"), "<h1>Fragment</h1><p>piece</p>").unwrap();

        let result = render(&site, BuildMode::Force, None);

        assert_eq!(result.summary.rendered, 2);
        let standalone = fs::read_to_string(site.output.join("algorithm/standalone.html")).unwrap();
        assert_eq!(standalone, document);
        let fragment = fs::read_to_string(site.output.join("algorithm/fragment.html")).unwrap();
        assert!(fragment.starts_with("<!DOCTYPE html>"));
        assert!(fragment.contains("<p>piece</p>"));
    }

    #[test]
    fn same_titles_share_an_output_path() {
        let site = site();
        let dir = site.content.join("algorithm");
        fs::write(dir.join("one.md"), "# Graphs\n\nfirst").unwrap();
        fs::write(dir.join("two.md"), "# Graphs\n\nsecond").unwrap();

        let result = render(&site, BuildMode::Force, None);

        let posts = &result.category.posts;
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].output_path, posts[1].output_path);
        // last in listing order wins
        let html = fs::read_to_string(&posts[0].output_path).unwrap();
        assert!(html.contains("second"));
        assert!(!html.contains("first"));
        assert_eq!(result.summary.rendered, 1);
    }

    #[test]
    fn colliding_titles_resolve_the_same_in_incremental_mode() {
        let site = site();
        let dir = site.content.join("algorithm");
        let one = dir.join("one.md");
        let two = dir.join("two.md");
        fs::write(&one, "# Graphs\n\nfirst").unwrap();
        fs::write(&two, "# Graphs\n\nsecond").unwrap();
        let old = SystemTime::now() - Duration::from_secs(3600);
        set_mtime(&one, old);
        set_mtime(&two, old);

        let first = render(&site, BuildMode::Incremental, None);

        assert_eq!(first.summary.rendered, 1);
        assert_eq!(first.summary.skipped, 0);
        let output = site.output.join("algorithm/graphs.html");
        let html = fs::read_to_string(&output).unwrap();
        assert!(html.contains("second"));
        assert!(!html.contains("first"));

        let second = render(&site, BuildMode::Incremental, None);
        assert_eq!(second.summary.rendered, 0);
        assert_eq!(second.summary.skipped, 1);

        // touching the losing document still rebuilds the shared page
        set_mtime(&one, SystemTime::now() + Duration::from_secs(3600));
        let third = render(&site, BuildMode::Incremental, None);
        assert_eq!(third.summary.rendered, 1);
        let html = fs::read_to_string(&output).unwrap();
        assert!(html.contains("second"));
    }

    #[test]
    fn parallel_rendering_writes_collisions_once() {
        let site = site();
        let dir = site.content.join("algorithm");
        for i in 0..8 {
            fs::write(dir.join(format!("{i}.md")), format!("# Graphs\n\nversion {i}")).unwrap();
        }

        let result = CategoryRenderer::new(
            &site.content,
            &site.output,
            &site.layout,
            &FsStorage,
            &CmarkRenderer::default(),
        )
        .parallel(true)
        .render_category("algorithm", BuildMode::Force, None);

        assert_eq!(result.summary.rendered, 1);
        assert_eq!(result.category.posts.len(), 8);
        let html = fs::read_to_string(site.output.join("algorithm/graphs.html")).unwrap();
        assert!(html.contains("version 7"));
    }

    #[test]
    fn reserved_slug_is_reported_not_written() {
        let site = site();
        fs::write(site.content.join("algorithm/idx.md"), "# Index").unwrap();

        let result = render(&site, BuildMode::Force, None);

        assert!(result.category.posts.is_empty());
        assert_eq!(result.summary.failed, 1);
        assert_eq!(result.failures.len(), 1);
        let index = fs::read_to_string(site.output.join("algorithm/index.html")).unwrap();
        assert!(index.contains(crate::layout::NO_POSTS_MESSAGE));
    }

    #[test]
    fn unreadable_document_is_skipped() {
        let site = site();
        let dir = site.content.join("algorithm");
        fs::write(dir.join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(dir.join("good.md"), "# Good").unwrap();

        let result = render(&site, BuildMode::Force, None);

        assert_eq!(result.summary.failed, 1);
        assert_eq!(result.summary.rendered, 1);
        assert_eq!(result.category.posts.len(), 1);
        assert!(result.failures.is_empty());
    }

    #[test]
    fn incremental_skips_fresh_output_and_rebuilds_stale() {
        let site = site();
        let source = site.content.join("algorithm/bs.md");
        fs::write(&source, "# Binary Search").unwrap();
        let old = SystemTime::now() - Duration::from_secs(3600);
        set_mtime(&source, old);

        render(&site, BuildMode::Incremental, None);
        let second = render(&site, BuildMode::Incremental, None);
        assert_eq!(second.summary.rendered, 0);
        assert_eq!(second.summary.skipped, 1);
        assert!(second.summary.index_written);

        set_mtime(&source, SystemTime::now() + Duration::from_secs(3600));
        let third = render(&site, BuildMode::Incremental, None);
        assert_eq!(third.summary.rendered, 1);
    }

    #[test]
    fn document_scope_writes_only_the_named_file() {
        let site = site();
        let dir = site.content.join("algorithm");
        fs::write(dir.join("a.md"), "# Alpha").unwrap();
        fs::write(dir.join("b.md"), "# Beta").unwrap();

        let result = render(&site, BuildMode::Force, Some("b.md"));

        assert_eq!(result.summary.rendered, 1);
        assert_eq!(result.summary.skipped, 0);
        assert!(!site.output.join("algorithm/alpha.html").exists());
        assert!(site.output.join("algorithm/beta.html").exists());
        let index = fs::read_to_string(site.output.join("algorithm/index.html")).unwrap();
        assert!(index.contains("alpha.html"));
        assert!(index.contains("beta.html"));
    }

    #[test]
    fn document_names_follow_listing_rules() {
        assert!(is_document_name("post.md"));
        assert!(is_document_name("page.HTML"));
        assert!(!is_document_name("index.html"));
        assert!(!is_document_name(".draft.md"));
        assert!(!is_document_name("notes.txt"));
        assert!(!is_document_name("../other/x.md"));
    }

    #[test]
    fn missing_source_directory_renders_empty_index() {
        let site = site();
        fs::remove_dir(site.content.join("algorithm")).unwrap();

        let result = render(&site, BuildMode::Incremental, None);

        assert!(result.category.posts.is_empty());
        assert!(result.summary.index_written);
        assert!(result.failures.is_empty());
    }

    #[test]
    fn parallel_rendering_keeps_listing_order() {
        let site = site();
        let dir = site.content.join("algorithm");
        for i in 0..20 {
            fs::write(dir.join(format!("{i:02}.md")), format!("# Post {i:02}")).unwrap();
        }

        let result = CategoryRenderer::new(
            &site.content,
            &site.output,
            &site.layout,
            &FsStorage,
            &CmarkRenderer::default(),
        )
        .parallel(true)
        .render_category("algorithm", BuildMode::Force, None);

        assert_eq!(result.summary.rendered, 20);
        let slugs: Vec<_> = result.category.posts.iter().map(|p| p.slug.clone()).collect();
        let expected: Vec<_> = (0..20).map(|i| format!("post-{i:02}")).collect();
        assert_eq!(slugs, expected);
    }
}
