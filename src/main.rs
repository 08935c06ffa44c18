//! CLI entry point for the miflib tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use miflib_core::{HttpClient, Pipeline, PipelineError, run_catalog};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.into_config()?;
    debug!(
        base_url = %config.transport.base_url,
        root = %config.root().display(),
        workers = config.pipeline.workers,
        groups = ?config.pipeline.groups,
        "configuration resolved"
    );
    info!("miflib starting");

    let client = Arc::new(HttpClient::new(config.transport.clone())?);
    client
        .login(&config.credentials.username, &config.credentials.password)
        .await
        .context("sign-in failed")?;

    let pipeline = Pipeline::new(client.clone(), config.pipeline.clone())?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing in-flight downloads");
            interrupt.cancel();
        }
    });

    match run_catalog(client, &pipeline, cancel).await {
        Ok(summary) => {
            info!(%summary, "all books processed");
            Ok(())
        }
        Err(PipelineError::Cancelled) => {
            warn!("run cancelled, rerun to continue where it stopped");
            Err(PipelineError::Cancelled.into())
        }
        Err(error) => Err(error.into()),
    }
}
