//! Static blog generator for quill.
//!
//! Renders a content tree of one directory per category into a static site:
//! one page per post, an index per category, and a root index linking every
//! category. Builds are incremental by default, skipping posts whose output
//! is already newer than their source.

pub mod assets;
pub mod builder;
pub mod category;
pub mod layout;
pub mod staleness;
pub mod storage;
pub mod templates;

pub use builder::{
    BuildConfig, BuildError, BuildFailure, BuildMode, BuildReport, BuildScope, SiteBuilder,
};
pub use category::{Category, CategorySummary, RenderedPost};
pub use staleness::needs_rebuild;
pub use storage::{FsStorage, Storage};
pub use templates::{Bindings, Template, TemplateSet};
