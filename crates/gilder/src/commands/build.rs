//! Full build command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use gilder_pipeline::{FailurePolicy, Pipeline, BUILD};

use crate::config::ConfigFile;

/// Run the build command.
pub async fn run(config: ConfigFile, output: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building...");

    let mut pipeline_config = config.pipeline;
    if let Some(output) = output {
        pipeline_config.dist = output;
    }
    let dist = pipeline_config.dist.clone();

    let pipeline = Pipeline::new(pipeline_config);
    let result = tokio::task::spawn_blocking(move || pipeline.series(BUILD, FailurePolicy::Abort))
        .await
        .context("Build did not finish")?;
    let report = result.context("Build failed")?;

    tracing::info!(
        "Ran {} tasks, wrote {} files in {}ms",
        report.completed.len(),
        report.files_written,
        report.duration_ms
    );

    tracing::info!("Output: {}", dist.display());

    Ok(())
}
