//! Development server command.

use anyhow::{Context, Result};
use gilder_pipeline::{FailurePolicy, Pipeline, DEV};
use gilder_server::DevServer;

use crate::config::ConfigFile;

/// Compile assets once, then serve and watch.
pub async fn run(config: ConfigFile, port: Option<u16>, open: bool) -> Result<()> {
    let mut server = config.server;
    if let Some(port) = port {
        server.port = port;
    }
    server.open |= open;

    let pipeline = Pipeline::new(config.pipeline);

    let initial = pipeline.clone();
    let report = tokio::task::spawn_blocking(move || initial.series(DEV, FailurePolicy::Report))
        .await
        .context("Initial build did not finish")??;

    if report.failed.is_empty() {
        tracing::info!(
            "Compiled assets ({} files) in {}ms",
            report.files_written,
            report.duration_ms
        );
    } else {
        tracing::warn!(
            "{} of {} tasks failed, watching for fixes",
            report.failed.len(),
            DEV.len()
        );
    }

    tracing::info!("Starting development server on port {}", server.port);

    DevServer::new(server, pipeline).start().await?;

    Ok(())
}
