//! Local preview server for quill sites.
//!
//! Serves the output directory and rebuilds incrementally whenever content,
//! templates or assets change on disk.

pub mod server;
pub mod watcher;

pub use server::{PreviewConfig, PreviewServer, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
