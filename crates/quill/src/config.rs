//! quill.toml loading.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quill_content::{LinkEncoding, MarkdownOptions};
use quill_static::BuildConfig;
use serde::Deserialize;

/// Configuration file structure (quill.toml).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub markdown: MarkdownOptions,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub build: BuildSettings,
}

#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Fixed category list; subdirectories of content_dir when absent
    pub categories: Option<Vec<String>>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            content_dir: default_content_dir(),
            output_dir: default_output_dir(),
            categories: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default = "default_templates_dir")]
    pub dir: String,
    #[serde(default)]
    pub strict: bool,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
            strict: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_stylesheet")]
    pub stylesheet: String,
    /// Host marker file copied verbatim, e.g. CNAME or .nojekyll
    pub marker: Option<String>,
    #[serde(default)]
    pub minify: bool,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            stylesheet: default_stylesheet(),
            marker: None,
            minify: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct LinksConfig {
    #[serde(default)]
    pub encoding: LinkEncoding,
}

#[derive(Debug, Deserialize, Default)]
pub struct BuildSettings {
    #[serde(default)]
    pub parallel: bool,
}

fn default_title() -> String {
    "Blog".to_string()
}
fn default_content_dir() -> String {
    "posts".to_string()
}
fn default_output_dir() -> String {
    "dist".to_string()
}
fn default_templates_dir() -> String {
    "templates".to_string()
}
fn default_stylesheet() -> String {
    "style.css".to_string()
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());

    Ok(config)
}

impl ConfigFile {
    /// Convert to the library build configuration.
    pub fn into_build_config(self) -> BuildConfig {
        BuildConfig {
            content_dir: PathBuf::from(self.site.content_dir),
            output_dir: PathBuf::from(self.site.output_dir),
            site_title: self.site.title,
            categories: self.site.categories,
            templates_dir: Some(PathBuf::from(self.templates.dir)),
            stylesheet: Some(PathBuf::from(self.assets.stylesheet)),
            marker_file: self.assets.marker.map(PathBuf::from),
            minify_css: self.assets.minify,
            markdown: self.markdown,
            link_encoding: self.links.encoding,
            strict_templates: self.templates.strict,
            parallel: self.build.parallel,
        }
    }
}
