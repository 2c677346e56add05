//! Gilder CLI - front-end asset pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "gilder")]
#[command(about = "Compile, bundle and serve front-end assets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to gilder.toml config file
    #[arg(short, long, default_value = "gilder.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the deployable output tree from scratch
    Build {
        /// Output directory (defaults to config or "dist")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile assets, then serve the source tree with live reload
    Dev {
        /// Port to listen on (defaults to config or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Open a browser once the server is up
        #[arg(long)]
        open: bool,
    },

    /// Preview the built output tree
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Directory to serve (defaults to config or "dist")
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = config::load(&cli.config)?;

    match cli.command {
        Commands::Build { output } => {
            commands::build::run(config, output).await?;
        }
        Commands::Dev { port, open } => {
            commands::dev::run(config, port, open).await?;
        }
        Commands::Serve { port, dir } => {
            commands::serve::run(config, port, dir).await?;
        }
    }

    Ok(())
}
