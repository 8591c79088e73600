//! Markdown to HTML conversion.

use pulldown_cmark::{html, Event, Options, Parser};
use serde::Deserialize;

/// Converts markdown text to an HTML fragment.
pub trait MarkdownRenderer: Send + Sync {
    /// Render markdown to HTML.
    fn render(&self, markdown: &str) -> String;
}

/// Options for the markdown renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MarkdownOptions {
    /// Enable GitHub-flavored extensions (tables, strikethrough, task lists, footnotes)
    #[serde(default = "default_true")]
    pub gfm: bool,

    /// Turn single newlines inside a paragraph into `<br />`
    #[serde(default)]
    pub line_breaks: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            line_breaks: false,
        }
    }
}

/// Markdown renderer backed by pulldown-cmark.
#[derive(Debug, Clone, Default)]
pub struct CmarkRenderer {
    options: MarkdownOptions,
}

impl CmarkRenderer {
    /// Create a renderer with the given options.
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    fn parser_options(&self) -> Options {
        if self.options.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
        } else {
            Options::empty()
        }
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn render(&self, markdown: &str) -> String {
        let line_breaks = self.options.line_breaks;
        let parser = Parser::new_ext(markdown, self.parser_options()).map(|event| match event {
            Event::SoftBreak if line_breaks => Event::HardBreak,
            other => other,
        });

        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);

        html_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_paragraphs() {
        let html = CmarkRenderer::default().render("# Hello\n\nWorld");

        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<p>World</p>"));
    }

    #[test]
    fn gfm_enables_tables() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |\n";

        let gfm = CmarkRenderer::default().render(md);
        let plain = CmarkRenderer::new(MarkdownOptions {
            gfm: false,
            line_breaks: false,
        })
        .render(md);

        assert!(gfm.contains("<table>"));
        assert!(!plain.contains("<table>"));
    }

    #[test]
    fn line_breaks_option_turns_soft_breaks_into_br() {
        let md = "first line\nsecond line";

        let soft = CmarkRenderer::default().render(md);
        let hard = CmarkRenderer::new(MarkdownOptions {
            gfm: true,
            line_breaks: true,
        })
        .render(md);

        assert!(!soft.contains("<br />"));
        assert!(hard.contains("first line<br />"));
    }
}
