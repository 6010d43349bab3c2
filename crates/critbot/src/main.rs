//! CriticalBot entry point
//!
//! Loads configuration, starts the plugin and pumps host callbacks from stdin
//! (or `--input`) until EOF or a shutdown signal.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info};

use critbot::config::{load_config, Args};
use critbot::host::{run_bridge, write_requests, ChannelHost, REQUEST_QUEUE_CAPACITY};
use critbot::logging::setup_logging;
use critbot::plugin::CritBotPlugin;
use critbot::signals::setup_shutdown_handler;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args).await?;
    setup_logging(&args, config.logging.as_ref())?;

    let policy = config.build_policy()?;
    let settings = config.plugin_settings()?;

    let (requests_tx, requests_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    let host = Arc::new(ChannelHost::new(requests_tx.clone()));
    let writer = tokio::spawn(write_requests(requests_rx, tokio::io::stdout()));

    let mut plugin = CritBotPlugin::new(Arc::new(policy), host.clone(), host, settings);
    let name = plugin.info().name;
    plugin.register_plugin_id(name);
    plugin.init().await?;

    let shutdown = setup_shutdown_handler();
    let summary = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            run_bridge(&plugin, BufReader::new(file), requests_tx, shutdown).await
        }
        None => run_bridge(&plugin, BufReader::new(tokio::io::stdin()), requests_tx, shutdown).await,
    };

    plugin.shutdown().await;
    // Dropping the plugin releases the last request senders so the writer can drain.
    drop(plugin);

    let written = writer.await??;
    match summary {
        Ok(summary) => {
            info!(
                lines = summary.lines,
                dispatched = summary.dispatched,
                malformed = summary.malformed,
                requests = written,
                "Host bridge closed"
            );
            Ok(())
        }
        Err(e) => {
            error!("Host bridge failed: {}", e);
            Err(e.into())
        }
    }
}
