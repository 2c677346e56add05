//! Preview server command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;

use crate::config::ConfigFile;

/// Serve the output tree as built, without includes or live reload.
pub async fn run(config: ConfigFile, port: u16, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or(config.pipeline.dist);
    if !dir.exists() {
        anyhow::bail!(
            "Directory not found: {}. Run 'gilder build' first.",
            dir.display()
        );
    }

    let host = config.server.host;
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))?;
    let addr = listener.local_addr().context("Invalid address")?;

    let url = format!("http://{}", addr);
    tracing::info!("Serving {} at {}", dir.display(), url);

    let app = Router::new().fallback_service(ServeDir::new(&dir));

    if config.server.open {
        let _ = open::that(&url);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
