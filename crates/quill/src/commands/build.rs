//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use quill_static::{BuildMode, BuildReport, BuildScope, SiteBuilder};

use crate::config::load_config;

/// Flags accepted by `quill build`.
#[derive(Debug, Default)]
pub struct BuildOptions {
    pub force: bool,
    pub output: Option<PathBuf>,
    pub category: Option<String>,
    pub document: Option<String>,
}

impl BuildOptions {
    fn mode(&self) -> BuildMode {
        BuildMode::from_force(self.force)
    }

    fn scope(&self) -> Result<BuildScope> {
        match (&self.category, &self.document) {
            (None, None) => Ok(BuildScope::All),
            (Some(category), None) => Ok(BuildScope::Category(category.clone())),
            (Some(category), Some(file)) => Ok(BuildScope::Document {
                category: category.clone(),
                file: file.clone(),
            }),
            (None, Some(_)) => anyhow::bail!("--document requires --category"),
        }
    }
}

/// Run the build command.
pub async fn run(config_path: &Path, options: BuildOptions) -> Result<()> {
    tracing::info!("Building site...");

    let mut config = load_config(config_path)?.into_build_config();
    if let Some(output) = &options.output {
        config.output_dir = output.clone();
    }

    let mode = options.mode();
    let scope = options.scope()?;

    let report = tokio::task::spawn_blocking(move || {
        SiteBuilder::from_config(config).build_scoped(mode, &scope)
    })
    .await??;

    log_report(&report);

    if !report.is_success() {
        anyhow::bail!("Build finished with {} failure(s)", report.failures.len());
    }

    Ok(())
}

fn log_report(report: &BuildReport) {
    for category in &report.categories {
        tracing::info!(
            "{}: {} rendered, {} skipped, {} failed",
            category.name,
            category.rendered,
            category.skipped,
            category.failed
        );
    }

    if report.assets.copied > 0 || report.assets.missing > 0 {
        tracing::info!(
            "Assets: {} copied, {} skipped, {} missing",
            report.assets.copied,
            report.assets.skipped,
            report.assets.missing
        );
    }

    for failure in &report.failures {
        tracing::warn!("Failed: {}", failure);
    }

    tracing::info!(
        "Built {} posts ({} up to date) in {}ms",
        report.rendered(),
        report.skipped(),
        report.duration_ms
    );
    tracing::info!("Output: {}", report.output_dir.display());
}
