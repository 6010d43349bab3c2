//! Graceful shutdown handling
//!
//! Listens for termination signals and fires a oneshot channel so the host
//! bridge can stop reading and the plugin can shut down cleanly.

use tokio::sync::oneshot;
use tracing::{error, info};

/// Set up a shutdown signal handler
///
/// # Platform Support
/// * Unix: SIGINT and SIGTERM
/// * Other platforms: Ctrl+C
///
/// If the handlers cannot be installed the error is logged and the returned
/// receiver never fires; the bridge then stops on input EOF only.
pub fn setup_shutdown_handler() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => {
                error!("Failed to install signal handlers: {}", e);
                // Keep the sender alive so the receiver does not resolve as cancelled.
                std::future::pending::<()>().await;
                drop(tx);
            }
        }
    });

    rx
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received - initiating graceful shutdown");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received - initiating graceful shutdown");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received - initiating graceful shutdown");
    Ok(())
}
