//! Blocks API server binary.

use anyhow::{Context, Result};
use blocks_runtime::{config, logging, wiring};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "blocks-api")]
#[command(about = "Read-only JSON query API over indexed Ethereum blocks and transactions")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP port, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = config::load(args.config.as_deref()).context("loading configuration")?;
    let mut config = loaded.config;
    if let Some(port) = args.port {
        config.http.port = port;
    }

    logging::init(&config.logging)?;
    match &loaded.source {
        Some(path) => info!(path = %path.display(), "Loaded configuration"),
        None => info!("No configuration file found, using defaults"),
    }

    let stores = wiring::connect_stores(&config).await?;
    wiring::run(config, stores, shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
    }
}
