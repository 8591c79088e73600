//! Source document formats.

use std::path::Path;

/// Format of a source document, decided from its extension and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Markdown text, converted through the markdown renderer
    Markdown,
    /// A piece of HTML that still needs the page chrome around it
    HtmlFragment,
    /// A complete HTML document, published as-is
    HtmlDocument,
}

impl SourceFormat {
    /// Check whether a file extension names a content file.
    pub fn is_content_extension(ext: &str) -> bool {
        matches!(
            ext.to_ascii_lowercase().as_str(),
            "md" | "markdown" | "html" | "htm"
        )
    }

    /// Detect the format of a file from its path and content.
    ///
    /// Returns `None` for files that are not content.
    pub fn detect(path: &Path, content: &str) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => {
                if is_full_document(content) {
                    Some(Self::HtmlDocument)
                } else {
                    Some(Self::HtmlFragment)
                }
            }
            _ => None,
        }
    }

    /// Check if this format is parsed as HTML.
    pub fn is_html(&self) -> bool {
        matches!(self, Self::HtmlFragment | Self::HtmlDocument)
    }
}

/// A document is complete when it opens with a doctype or an `<html>` root.
fn is_full_document(content: &str) -> bool {
    let head = content.trim_start().to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}
