//! Static site builder.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use quill_content::{CmarkRenderer, LinkEncoding, MarkdownOptions, MarkdownRenderer};

use crate::assets::{AssetSummary, AssetSync};
use crate::category::{is_document_name, CategoryRenderer, CategorySummary, INDEX_FILE};
use crate::layout::Layout;
use crate::storage::{FsStorage, Storage};
use crate::templates::TemplateSet;

/// Configuration for building a site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Content root, one subdirectory per category
    pub content_dir: PathBuf,

    /// Output root
    pub output_dir: PathBuf,

    /// Site title
    pub site_title: String,

    /// Fixed category list; discovered from the content root when `None`
    pub categories: Option<Vec<String>>,

    /// Directory holding template overrides
    pub templates_dir: Option<PathBuf>,

    /// Stylesheet copied to the output root and linked from every page
    pub stylesheet: Option<PathBuf>,

    /// Host marker file copied to the output root (e.g. `CNAME`)
    pub marker_file: Option<PathBuf>,

    /// Minify the stylesheet while copying
    pub minify_css: bool,

    /// Markdown renderer options
    pub markdown: MarkdownOptions,

    /// How slugs and category names are written into links
    pub link_encoding: LinkEncoding,

    /// Warn about unbound template placeholders
    pub strict_templates: bool,

    /// Render documents within a category in parallel
    pub parallel: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("posts"),
            output_dir: PathBuf::from("dist"),
            site_title: "Blog".to_string(),
            categories: None,
            templates_dir: Some(PathBuf::from("templates")),
            stylesheet: Some(PathBuf::from("style.css")),
            marker_file: None,
            minify_css: false,
            markdown: MarkdownOptions::default(),
            link_encoding: LinkEncoding::default(),
            strict_templates: false,
            parallel: false,
        }
    }
}

/// Whether up-to-date output is skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    /// Only rewrite output older than its source (default)
    #[default]
    Incremental,
    /// Rewrite every document and asset
    Force,
}

impl BuildMode {
    /// Mode for a `--force` style flag.
    pub fn from_force(force: bool) -> Self {
        if force {
            Self::Force
        } else {
            Self::Incremental
        }
    }

    /// Check if this mode rewrites everything.
    pub fn is_force(&self) -> bool {
        matches!(self, Self::Force)
    }
}

/// Part of the site a build renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BuildScope {
    /// Every category
    #[default]
    All,
    /// A single category
    Category(String),
    /// A single document file within a category
    Document { category: String, file: String },
}

impl BuildScope {
    fn includes(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Category(name) | Self::Document { category: name, .. } => name == category,
        }
    }

    fn document(&self) -> Option<&str> {
        match self {
            Self::Document { file, .. } => Some(file.as_str()),
            _ => None,
        }
    }
}

/// An artifact that could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    /// Path that failed
    pub path: PathBuf,

    /// What went wrong
    pub reason: String,
}

impl BuildFailure {
    /// Record a failure for `path`.
    pub fn new(path: &Path, reason: impl fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildReport {
    /// Per-category counts, in category order
    pub categories: Vec<CategorySummary>,

    /// Asset sync counts
    pub assets: AssetSummary,

    /// Everything that could not be written
    pub failures: Vec<BuildFailure>,

    /// Whether the root index was written
    pub root_index_written: bool,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

impl BuildReport {
    /// A build succeeded when nothing failed to write.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Posts written across all categories.
    pub fn rendered(&self) -> usize {
        self.categories.iter().map(|c| c.rendered).sum()
    }

    /// Posts left untouched across all categories.
    pub fn skipped(&self) -> usize {
        self.categories.iter().map(|c| c.skipped).sum()
    }
}

/// Errors that abort a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to create output directory: {0}")]
    OutputError(String),

    #[error("Failed to read content directory: {0}")]
    ContentError(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),
}

/// Static site builder.
pub struct SiteBuilder {
    config: BuildConfig,
    templates: TemplateSet,
    storage: Arc<dyn Storage>,
    markdown: Arc<dyn MarkdownRenderer>,
}

impl SiteBuilder {
    /// Create a builder with an explicit template set.
    pub fn new(config: BuildConfig, templates: TemplateSet) -> Self {
        let markdown = Arc::new(CmarkRenderer::new(config.markdown));

        Self {
            config,
            templates,
            storage: Arc::new(FsStorage),
            markdown,
        }
    }

    /// Create a builder, loading templates from the configured directory.
    pub fn from_config(config: BuildConfig) -> Self {
        let templates = load_templates(&config, &FsStorage);
        Self::new(config, templates)
    }

    /// Use a different storage backend.
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Use a different markdown renderer.
    pub fn with_markdown(mut self, markdown: Arc<dyn MarkdownRenderer>) -> Self {
        self.markdown = markdown;
        self
    }

    /// The build configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Reload templates from the configured directory.
    pub fn reload_templates(&mut self) {
        self.templates = load_templates(&self.config, self.storage.as_ref());
    }

    /// Build the whole site.
    pub fn build(&self, mode: BuildMode) -> Result<BuildReport, BuildError> {
        self.build_scoped(mode, &BuildScope::All)
    }

    /// Build part of the site.
    ///
    /// Assets and the root index are handled in every scope.
    pub fn build_scoped(
        &self,
        mode: BuildMode,
        scope: &BuildScope,
    ) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let storage = self.storage.as_ref();
        let output_dir = &self.config.output_dir;

        storage
            .create_dir_all(output_dir)
            .map_err(|e| BuildError::OutputError(format!("{}: {}", output_dir.display(), e)))?;

        let categories = self.discover_categories()?;
        self.check_scope(scope, &categories)?;

        let (assets, mut failures) = AssetSync::new(storage, output_dir)
            .minify(self.config.minify_css)
            .sync(&self.asset_sources(), mode);

        let layout = self.layout(categories.clone());
        if self.config.strict_templates {
            for (template, name) in layout.unbound_placeholders() {
                tracing::warn!("Template {} has unbound placeholder {{{{{}}}}}", template, name);
            }
        }
        let renderer = CategoryRenderer::new(
            &self.config.content_dir,
            output_dir,
            &layout,
            storage,
            self.markdown.as_ref(),
        )
        .parallel(self.config.parallel);

        let mut summaries = Vec::new();
        for category in categories.iter().filter(|c| scope.includes(c)) {
            let result = renderer.render_category(category, mode, scope.document());
            summaries.push(result.summary);
            failures.extend(result.failures);
        }

        let root_index = output_dir.join(INDEX_FILE);
        let root_index_written = match storage.write(&root_index, layout.root_index().as_bytes()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to write {}: {}", root_index.display(), e);
                failures.push(BuildFailure::new(&root_index, e));
                false
            }
        };

        Ok(BuildReport {
            categories: summaries,
            assets,
            failures,
            root_index_written,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: output_dir.clone(),
        })
    }

    /// The category set for this run, in order.
    ///
    /// A configured list wins; otherwise every non-hidden subdirectory of the
    /// content root is a category. A missing content root has no categories.
    pub fn discover_categories(&self) -> Result<Vec<String>, BuildError> {
        if let Some(configured) = &self.config.categories {
            return Ok(configured
                .iter()
                .filter(|name| {
                    let valid = is_valid_category_name(name);
                    if !valid {
                        tracing::warn!("Ignoring invalid category name: {:?}", name);
                    }
                    valid
                })
                .cloned()
                .collect());
        }

        let content_dir = &self.config.content_dir;
        if !self.storage.is_dir(content_dir) {
            tracing::warn!("Content directory not found: {}", content_dir.display());
            return Ok(Vec::new());
        }

        let entries = self
            .storage
            .list_dir(content_dir)
            .map_err(|e| BuildError::ContentError(format!("{}: {}", content_dir.display(), e)))?;

        Ok(entries
            .into_iter()
            .filter(|e| e.is_dir && !e.is_hidden())
            .map(|e| e.name)
            .collect())
    }

    fn check_scope(&self, scope: &BuildScope, categories: &[String]) -> Result<(), BuildError> {
        let category = match scope {
            BuildScope::All => return Ok(()),
            BuildScope::Category(name) | BuildScope::Document { category: name, .. } => name,
        };

        if !categories.contains(category) {
            return Err(BuildError::UnknownCategory(category.clone()));
        }

        if let Some(file) = scope.document() {
            let path = self.config.content_dir.join(category).join(file);
            let exists = matches!(self.storage.modified(&path), Ok(Some(_)));
            if !is_document_name(file) || !exists || self.storage.is_dir(&path) {
                return Err(BuildError::DocumentNotFound(path.display().to_string()));
            }
        }

        Ok(())
    }

    fn asset_sources(&self) -> Vec<PathBuf> {
        self.config
            .stylesheet
            .iter()
            .chain(self.config.marker_file.iter())
            .cloned()
            .collect()
    }

    fn layout(&self, categories: Vec<String>) -> Layout {
        let stylesheet = self
            .config
            .stylesheet
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("style.css");

        Layout::new(self.templates.clone(), &self.config.site_title, categories)
            .with_stylesheet(stylesheet)
            .with_link_encoding(self.config.link_encoding)
    }
}

fn load_templates(config: &BuildConfig, storage: &dyn Storage) -> TemplateSet {
    match &config.templates_dir {
        Some(dir) => TemplateSet::load(dir, storage),
        None => TemplateSet::builtin(),
    }
}

/// A category name must be a single, non-hidden path segment.
fn is_valid_category_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\'])
}
