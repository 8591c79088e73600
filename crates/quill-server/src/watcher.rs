//! File watching for rebuild on change.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use quill_content::SourceFormat;
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A markdown or HTML source was created or modified
    ContentModified(PathBuf),

    /// A template file was created or modified
    TemplateModified(PathBuf),

    /// Any other watched file changed (stylesheet, marker file)
    AssetModified(PathBuf),

    /// A watched file was removed
    Removed(PathBuf),
}

impl WatchEvent {
    /// Path the event refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::ContentModified(p)
            | Self::TemplateModified(p)
            | Self::AssetModified(p)
            | Self::Removed(p) => p,
        }
    }
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher for the given paths.
    ///
    /// Changes under `templates_dir` are reported as template changes.
    /// Returns the watcher and a channel to receive events.
    pub fn new(
        paths: &[PathBuf],
        templates_dir: Option<PathBuf>,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                let mode = if path.is_dir() {
                    RecursiveMode::Recursive
                } else {
                    RecursiveMode::NonRecursive
                };
                watcher.watch(path, mode).map_err(std::io::Error::other)?;
            } else {
                tracing::debug!("Not watching missing path {}", path.display());
            }
        }

        std::thread::spawn(move || {
            let debounce_duration = Duration::from_millis(100);

            while let Ok(first) = sync_rx.recv() {
                // Editors emit bursts of events for one save; wait for quiet
                let mut burst = vec![first];
                while let Ok(event) = sync_rx.recv_timeout(debounce_duration) {
                    burst.push(event);
                }

                if let Some(e) = coalesce(&burst, templates_dir.as_deref()) {
                    if async_tx.blocking_send(e).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Reduce a burst of notify events to the one change a rebuild must honor.
///
/// A template change wins, since it forces a full rebuild; otherwise the
/// last classified change in the burst is reported.
fn coalesce(burst: &[notify::Event], templates_dir: Option<&Path>) -> Option<WatchEvent> {
    let mut latest = None;

    for event in burst {
        for path in &event.paths {
            match classify_event(path, &event.kind, templates_dir) {
                Some(e @ WatchEvent::TemplateModified(_)) => return Some(e),
                Some(e) => latest = Some(e),
                None => {}
            }
        }
    }

    latest
}

/// Classify a notify event into a WatchEvent.
fn classify_event(
    path: &Path,
    kind: &notify::EventKind,
    templates_dir: Option<&Path>,
) -> Option<WatchEvent> {
    use notify::EventKind;

    let path_buf = path.to_path_buf();
    match kind {
        EventKind::Remove(_) => Some(WatchEvent::Removed(path_buf)),
        EventKind::Create(_) | EventKind::Modify(_) => {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

            if templates_dir.is_some_and(|dir| path.starts_with(dir)) {
                Some(WatchEvent::TemplateModified(path_buf))
            } else if SourceFormat::is_content_extension(ext) {
                Some(WatchEvent::ContentModified(path_buf))
            } else {
                Some(WatchEvent::AssetModified(path_buf))
            }
        }
        _ => None,
    }
}
