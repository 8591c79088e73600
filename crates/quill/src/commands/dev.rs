//! Development server command.

use std::path::Path;

use anyhow::Result;
use quill_server::{PreviewConfig, PreviewServer};
use quill_static::SiteBuilder;

use crate::config::load_config;

/// Run the dev server.
pub async fn run(config_path: &Path, port: u16, open: bool) -> Result<()> {
    tracing::info!("Starting development server on port {}", port);

    let config = load_config(config_path)?.into_build_config();
    let builder = SiteBuilder::from_config(config);

    let server_config = PreviewConfig {
        port,
        open,
        ..Default::default()
    };

    PreviewServer::new(server_config, builder).start().await?;

    Ok(())
}
