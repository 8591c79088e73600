//! Static asset sync.
//!
//! Shared assets (the stylesheet, a host marker file such as `CNAME` or
//! `.nojekyll`) are copied into the output root when they are missing there
//! or their source is newer, the same rule posts follow.

use std::path::{Path, PathBuf};

use crate::builder::{BuildFailure, BuildMode};
use crate::staleness::needs_rebuild;
use crate::storage::Storage;

/// Counts reported for asset sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSummary {
    /// Assets copied this run
    pub copied: usize,

    /// Assets already up to date
    pub skipped: usize,

    /// Configured assets whose source does not exist
    pub missing: usize,
}

/// Copies shared assets into the output root.
pub struct AssetSync<'a> {
    storage: &'a dyn Storage,
    output_dir: &'a Path,
    minify: bool,
}

impl<'a> AssetSync<'a> {
    /// Create an asset sync writing into `output_dir`.
    pub fn new(storage: &'a dyn Storage, output_dir: &'a Path) -> Self {
        Self {
            storage,
            output_dir,
            minify: false,
        }
    }

    /// Minify stylesheets while copying.
    pub fn minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Sync every source into the output root.
    pub fn sync(&self, sources: &[PathBuf], mode: BuildMode) -> (AssetSummary, Vec<BuildFailure>) {
        let mut summary = AssetSummary::default();
        let mut failures = Vec::new();

        for source in sources {
            let Some(file_name) = source.file_name() else {
                tracing::warn!("Asset path has no file name: {}", source.display());
                continue;
            };
            let dest = self.output_dir.join(file_name);

            let source_modified = match self.storage.modified(source) {
                Ok(Some(time)) => time,
                Ok(None) => {
                    tracing::warn!("Asset not found: {}", source.display());
                    summary.missing += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Failed to stat {}: {}", source.display(), e);
                    failures.push(BuildFailure::new(source, e));
                    continue;
                }
            };

            let dest_modified = self.storage.modified(&dest).unwrap_or_default();
            if !needs_rebuild(source_modified, dest_modified, mode.is_force()) {
                summary.skipped += 1;
                continue;
            }

            match self.copy(source, &dest) {
                Ok(()) => {
                    tracing::info!("Copied {} to {}", source.display(), dest.display());
                    summary.copied += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to copy {}: {}", source.display(), e);
                    failures.push(BuildFailure::new(&dest, e));
                }
            }
        }

        (summary, failures)
    }

    fn copy(&self, source: &Path, dest: &Path) -> std::io::Result<()> {
        let bytes = self.storage.read(source)?;
        let is_css = source
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("css"));

        if self.minify && is_css {
            if let Ok(css) = std::str::from_utf8(&bytes) {
                match minify_css(css) {
                    Ok(minified) => return self.storage.write(dest, minified.as_bytes()),
                    Err(e) => {
                        tracing::warn!("{}: {}, copying unminified", source.display(), e);
                    }
                }
            }
        }

        self.storage.write(dest, &bytes)
    }
}

/// Minify CSS using lightningcss.
pub fn minify_css(css: &str) -> Result<String, String> {
    use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

    let stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| format!("CSS parse error: {}", e))?;

    let minified = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|e| format!("CSS minify error: {}", e))?;

    Ok(minified.code)
}
