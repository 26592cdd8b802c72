//! Signal handling for graceful shutdown.

use tokio::signal::unix::{SignalKind, signal};

/// Completes when SIGTERM or SIGINT (Ctrl+C) is received.
pub async fn shutdown_signal() {
    let sigterm = signal(SignalKind::terminate());
    let sigint = signal(SignalKind::interrupt());

    match (sigterm, sigint) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Failed to install signal handlers, falling back to Ctrl+C");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
    }
}
