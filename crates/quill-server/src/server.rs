//! Preview server implementation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;

use quill_static::{BuildError, BuildMode, BuildReport, SiteBuilder};

use crate::watcher::{FileWatcher, WatchEvent};

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open browser on start
    pub open: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address: {0}")]
    AddressError(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Build failed: {0}")]
    Build(#[from] BuildError),
}

/// Serves the output directory and rebuilds on change.
pub struct PreviewServer {
    config: PreviewConfig,
    builder: Arc<RwLock<SiteBuilder>>,
}

impl PreviewServer {
    /// Create a preview server around a site builder.
    pub fn new(config: PreviewConfig, builder: SiteBuilder) -> Self {
        Self {
            config,
            builder: Arc::new(RwLock::new(builder)),
        }
    }

    /// Build once, then serve and watch until the process exits.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| ServerError::AddressError(format!("{}: {}", self.config.host, e)))?;

        run_build(&self.builder, BuildMode::Incremental).await?;

        let (output_dir, watch_paths, templates_dir) = {
            let builder = self.builder.read().await;
            let config = builder.config();
            (
                config.output_dir.clone(),
                watch_paths(config),
                config.templates_dir.clone(),
            )
        };

        let (watcher, mut rx) = FileWatcher::new(&watch_paths, templates_dir)
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        let builder = Arc::clone(&self.builder);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&builder, event).await;
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = Router::new().fallback_service(ServeDir::new(&output_dir));

        tracing::info!(
            "Serving {} at http://{}",
            output_dir.display(),
            addr
        );

        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

/// Everything a rebuild depends on.
fn watch_paths(config: &quill_static::BuildConfig) -> Vec<PathBuf> {
    let mut paths = vec![config.content_dir.clone()];
    paths.extend(config.templates_dir.iter().cloned());
    paths.extend(config.stylesheet.iter().cloned());
    paths.extend(config.marker_file.iter().cloned());
    paths
}

/// Handle file watch events.
async fn handle_watch_event(builder: &Arc<RwLock<SiteBuilder>>, event: WatchEvent) {
    let mode = match &event {
        WatchEvent::TemplateModified(path) => {
            tracing::info!("Template modified: {}", path.display());
            builder.write().await.reload_templates();
            // page chrome changed for every post
            BuildMode::Force
        }
        WatchEvent::ContentModified(path) | WatchEvent::AssetModified(path) => {
            tracing::info!("Modified: {}", path.display());
            BuildMode::Incremental
        }
        WatchEvent::Removed(path) => {
            tracing::info!(
                "Removed: {} (published output is left in place)",
                path.display()
            );
            BuildMode::Incremental
        }
    };

    if let Err(e) = run_build(builder, mode).await {
        tracing::warn!("Rebuild failed: {}", e);
    }
}

/// Run a build on the blocking pool and log its outcome.
async fn run_build(
    builder: &Arc<RwLock<SiteBuilder>>,
    mode: BuildMode,
) -> Result<BuildReport, ServerError> {
    let builder = Arc::clone(builder);
    let report = tokio::task::spawn_blocking(move || builder.blocking_read().build(mode))
        .await
        .map_err(|e| ServerError::WatchError(format!("build task failed: {}", e)))??;

    for failure in &report.failures {
        tracing::warn!("Failed: {}", failure);
    }
    tracing::info!(
        "Rebuilt in {}ms: {} rendered, {} skipped",
        report.duration_ms,
        report.rendered(),
        report.skipped()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_static::{BuildConfig, TemplateSet};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn creates_server_with_default_config() {
        let config = PreviewConfig::default();
        assert_eq!(config.port, 7777);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn watches_content_templates_and_assets() {
        let config = BuildConfig {
            marker_file: Some(PathBuf::from("CNAME")),
            ..Default::default()
        };

        let paths = watch_paths(&config);

        assert_eq!(
            paths,
            vec![
                PathBuf::from("posts"),
                PathBuf::from("templates"),
                PathBuf::from("style.css"),
                PathBuf::from("CNAME"),
            ]
        );
    }

    #[tokio::test]
    async fn content_change_triggers_incremental_rebuild() {
        let temp = tempdir().unwrap();
        let posts = temp.path().join("posts/algorithm");
        fs::create_dir_all(&posts).unwrap();
        let config = BuildConfig {
            content_dir: temp.path().join("posts"),
            output_dir: temp.path().join("dist"),
            templates_dir: None,
            stylesheet: None,
            ..Default::default()
        };
        let builder = Arc::new(RwLock::new(SiteBuilder::new(config, TemplateSet::builtin())));

        run_build(&builder, BuildMode::Incremental).await.unwrap();

        let source = posts.join("new.md");
        fs::write(&source, "# Fresh Post").unwrap();
        handle_watch_event(&builder, WatchEvent::ContentModified(source)).await;

        assert!(temp.path().join("dist/algorithm/fresh-post.html").exists());
    }
}
