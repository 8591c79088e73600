//! Content handling for quill posts.
//!
//! This crate knows how to look at a single source document: which format it
//! is in, what its display title is, which slug it publishes under, and how
//! its markdown turns into HTML. It never touches the filesystem.

pub mod format;
pub mod markdown;
pub mod slug;
pub mod title;

pub use format::SourceFormat;
pub use markdown::{CmarkRenderer, MarkdownOptions, MarkdownRenderer};
pub use slug::{derive_slug, LinkEncoding};
pub use title::{resolve_title, UNTITLED};
