//! Placeholder templates for page composition.
//!
//! Templates are plain text with `{{name}}` placeholders. Composition is a
//! single left-to-right pass: bound placeholders are replaced by their value,
//! unbound ones are left in the output verbatim, and replacement text is
//! never scanned again. Nothing is escaped implicitly; [`Bindings::text`]
//! escapes and [`Bindings::html`] does not.

use std::io;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::storage::Storage;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder pattern")
});

/// Ordered mapping of placeholder names to replacement text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    entries: Vec<(String, String)>,
}

impl Bindings {
    /// Create an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a placeholder to HTML, inserted as-is.
    pub fn html(mut self, name: &str, html: impl Into<String>) -> Self {
        self.insert(name, html.into());
        self
    }

    /// Bind a placeholder to plain text, HTML-escaped on insertion.
    pub fn text(mut self, name: &str, text: &str) -> Self {
        self.insert(name, escape_html(text));
        self
    }

    /// Look up the replacement for a placeholder.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn insert(&mut self, name: &str, value: String) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }
}

/// Result of rendering a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Composed text
    pub text: String,

    /// Placeholders that had no binding, in order of first appearance
    pub unbound: Vec<String>,
}

/// A named template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    source: String,
}

impl Template {
    /// Create a template from its source text.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Template name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names used by this template, in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for caps in PLACEHOLDER_RE.captures_iter(&self.source) {
            if let Some(name) = caps.get(1).map(|m| m.as_str()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Fill in the placeholders.
    pub fn render(&self, bindings: &Bindings) -> Rendered {
        let mut unbound: Vec<String> = Vec::new();

        let text = PLACEHOLDER_RE
            .replace_all(&self.source, |caps: &Captures| {
                let name = &caps[1];
                match bindings.get(name) {
                    Some(value) => value.to_string(),
                    None => {
                        if !unbound.iter().any(|n| n == name) {
                            unbound.push(name.to_string());
                        }
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();

        Rendered { text, unbound }
    }
}

/// Compose template text with bindings, leaving unbound placeholders in place.
pub fn compose(template: &str, bindings: &Bindings) -> String {
    Template::new("inline", template).render(bindings).text
}

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// The templates a site is rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    /// Page head and navigation, shared by every page
    pub header: Template,
    /// Page end, shared by every page
    pub footer: Template,
    /// Body of a single post
    pub post: Template,
    /// Body of a category index
    pub category: Template,
    /// Body of the site root index
    pub root: Template,
}

impl TemplateSet {
    /// File names looked up in a templates directory, with their built-in defaults.
    pub const SOURCES: [(&'static str, &'static str); 5] = [
        ("header.html", HEADER_TEMPLATE),
        ("footer.html", FOOTER_TEMPLATE),
        ("post.html", POST_TEMPLATE),
        ("category.html", CATEGORY_TEMPLATE),
        ("root.html", ROOT_TEMPLATE),
    ];

    /// The built-in minimal page shell.
    pub fn builtin() -> Self {
        Self {
            header: Template::new("header.html", HEADER_TEMPLATE),
            footer: Template::new("footer.html", FOOTER_TEMPLATE),
            post: Template::new("post.html", POST_TEMPLATE),
            category: Template::new("category.html", CATEGORY_TEMPLATE),
            root: Template::new("root.html", ROOT_TEMPLATE),
        }
    }

    /// Load templates from a directory.
    ///
    /// Each file that is missing or unreadable is replaced by its built-in
    /// default, so loading never fails.
    pub fn load(dir: &Path, storage: &dyn Storage) -> Self {
        if !storage.is_dir(dir) {
            tracing::info!(
                "Templates directory {} not found, using built-in templates",
                dir.display()
            );
            return Self::builtin();
        }

        let load_one = |name: &str, fallback: &str| -> Template {
            let path = dir.join(name);
            match storage.read_to_string(&path) {
                Ok(source) => {
                    tracing::debug!("Loaded template {}", path.display());
                    Template::new(name, source)
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("No {} in {}, using built-in", name, dir.display());
                    Template::new(name, fallback)
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to read template {}: {}, using built-in",
                        path.display(),
                        e
                    );
                    Template::new(name, fallback)
                }
            }
        };

        Self {
            header: load_one("header.html", HEADER_TEMPLATE),
            footer: load_one("footer.html", FOOTER_TEMPLATE),
            post: load_one("post.html", POST_TEMPLATE),
            category: load_one("category.html", CATEGORY_TEMPLATE),
            root: load_one("root.html", ROOT_TEMPLATE),
        }
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

const HEADER_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{title}} - {{site_title}}</title>
  <link rel="stylesheet" href="{{stylesheet}}">
</head>
<body>
  <nav class="site-nav">
    {{nav_links}}
  </nav>
"##;

const FOOTER_TEMPLATE: &str = r##"  <footer class="site-footer">
    <p>{{site_title}}</p>
  </footer>
</body>
</html>
"##;

const POST_TEMPLATE: &str = r##"<main class="blog-container">
<article class="blog-post">
<h1>{{title}}</h1>
{{body}}
</article>
</main>
"##;

const CATEGORY_TEMPLATE: &str = r##"<main class="blog-container">
<h1>{{category_label}}</h1>
<p class="post-count">{{post_count}} posts</p>
<ul class="post-list">
{{post_list}}
</ul>
</main>
"##;

const ROOT_TEMPLATE: &str = r##"<main class="blog-container">
<h1>{{site_title}}</h1>
<ul class="category-list">
{{category_list}}
</ul>
</main>
"##;
