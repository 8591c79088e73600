//! Page layout: header, body and footer composition.

use quill_content::LinkEncoding;

use crate::category::RenderedPost;
use crate::templates::{escape_html, Bindings, TemplateSet};

/// Shown in a category index that has no posts.
pub const NO_POSTS_MESSAGE: &str = "No posts yet.";

/// Shown in the root index when no categories exist.
pub const NO_CATEGORIES_MESSAGE: &str = "No categories yet.";

/// Page title of the root index, also its navigation label.
pub const HOME_TITLE: &str = "Home";

/// Where a page sits in the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDepth {
    /// The site root index
    Root,
    /// A category index or post, one directory down
    Nested,
}

impl PageDepth {
    /// Relative prefix from a page at this depth back to the output root.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Root => "",
            Self::Nested => "../",
        }
    }
}

/// Composes complete pages from a [`TemplateSet`].
#[derive(Debug, Clone)]
pub struct Layout {
    templates: TemplateSet,
    site_title: String,
    categories: Vec<String>,
    stylesheet: String,
    link_encoding: LinkEncoding,
}

impl Layout {
    /// Create a layout for a site with the given categories.
    pub fn new(
        templates: TemplateSet,
        site_title: impl Into<String>,
        categories: Vec<String>,
    ) -> Self {
        Self {
            templates,
            site_title: site_title.into(),
            categories,
            stylesheet: "style.css".to_string(),
            link_encoding: LinkEncoding::default(),
        }
    }

    /// Set the stylesheet file name, relative to the output root.
    pub fn with_stylesheet(mut self, stylesheet: impl Into<String>) -> Self {
        self.stylesheet = stylesheet.into();
        self
    }

    /// Set the link encoding policy.
    pub fn with_link_encoding(mut self, link_encoding: LinkEncoding) -> Self {
        self.link_encoding = link_encoding;
        self
    }

    /// Categories linked from the navigation and root index.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// The active link encoding policy.
    pub fn link_encoding(&self) -> LinkEncoding {
        self.link_encoding
    }

    /// Stylesheet link target for a page at `depth`.
    pub fn stylesheet_href(&self, depth: PageDepth) -> String {
        format!(
            "{}{}",
            depth.prefix(),
            self.link_encoding.segment(&self.stylesheet)
        )
    }

    /// Navigation links for a page at `depth`: home, then every category.
    pub fn nav_links(&self, depth: PageDepth) -> String {
        let prefix = depth.prefix();
        let mut links = vec![format!(r#"<a href="{prefix}index.html">{HOME_TITLE}</a>"#)];

        for category in &self.categories {
            links.push(format!(
                r#"<a href="{prefix}{}/index.html">{}</a>"#,
                self.link_encoding.segment(category),
                escape_html(category)
            ));
        }

        links.join("\n    ")
    }

    /// Wrap a composed body in the header and footer.
    pub fn page(&self, title: &str, depth: PageDepth, body: &str) -> String {
        let bindings = self.page_bindings(title, depth);

        let header = self.templates.header.render(&bindings).text;
        let footer = self.templates.footer.render(&bindings).text;

        format!("{header}{body}{footer}")
    }

    /// A full post page around rendered content HTML.
    pub fn post_page(&self, category: &str, title: &str, content_html: &str) -> String {
        let bindings = self.post_bindings(category, title, content_html);

        let body = self.templates.post.render(&bindings).text;
        self.page(title, PageDepth::Nested, &body)
    }

    /// The index page of a category, listing posts in the given order.
    pub fn category_index(&self, category: &str, posts: &[RenderedPost]) -> String {
        let bindings = self.category_bindings(category, posts);

        let body = self.templates.category.render(&bindings).text;
        self.page(category, PageDepth::Nested, &body)
    }

    /// The site root index, linking every category.
    pub fn root_index(&self) -> String {
        let body = self.templates.root.render(&self.root_bindings()).text;
        self.page(HOME_TITLE, PageDepth::Root, &body)
    }

    /// Placeholders each template uses that no page ever binds, as
    /// `(template name, placeholder)` pairs.
    pub fn unbound_placeholders(&self) -> Vec<(String, String)> {
        let page = self.page_bindings("", PageDepth::Root);
        let checks = [
            (&self.templates.header, page.clone()),
            (&self.templates.footer, page),
            (&self.templates.post, self.post_bindings("", "", "")),
            (&self.templates.category, self.category_bindings("", &[])),
            (&self.templates.root, self.root_bindings()),
        ];

        checks
            .into_iter()
            .flat_map(|(template, bindings)| {
                template
                    .render(&bindings)
                    .unbound
                    .into_iter()
                    .map(move |name| (template.name().to_string(), name))
            })
            .collect()
    }

    fn page_bindings(&self, title: &str, depth: PageDepth) -> Bindings {
        Bindings::new()
            .text("title", title)
            .text("site_title", &self.site_title)
            .html("stylesheet", self.stylesheet_href(depth))
            .html("nav_links", self.nav_links(depth))
    }

    fn post_bindings(&self, category: &str, title: &str, content_html: &str) -> Bindings {
        Bindings::new()
            .text("title", title)
            .text("site_title", &self.site_title)
            .text("category", category)
            .html("body", content_html)
    }

    fn category_bindings(&self, category: &str, posts: &[RenderedPost]) -> Bindings {
        let post_list = if posts.is_empty() {
            format!(r#"<li class="empty">{NO_POSTS_MESSAGE}</li>"#)
        } else {
            posts
                .iter()
                .map(|post| {
                    format!(
                        r#"<li><a href="{}">{}</a></li>"#,
                        self.link_encoding.post_href(&post.slug),
                        escape_html(&post.title)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        Bindings::new()
            .text("site_title", &self.site_title)
            .text("category", category)
            .text("category_label", &category.to_uppercase())
            .html("post_count", posts.len().to_string())
            .html("post_list", post_list)
    }

    fn root_bindings(&self) -> Bindings {
        let category_list = if self.categories.is_empty() {
            format!(r#"<li class="empty">{NO_CATEGORIES_MESSAGE}</li>"#)
        } else {
            self.categories
                .iter()
                .map(|category| {
                    format!(
                        r#"<li><a href="{}/index.html">{}</a></li>"#,
                        self.link_encoding.segment(category),
                        escape_html(category)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        Bindings::new()
            .text("site_title", &self.site_title)
            .html("category_count", self.categories.len().to_string())
            .html("category_list", category_list)
    }
}
