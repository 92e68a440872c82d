//! OS signal handling.
//!
//! SIGINT (Ctrl+C) and, on Unix, SIGTERM trigger graceful shutdown.

use crate::lifecycle::Shutdown;

/// Resolve when the process is asked to stop.
pub async fn wait_for_termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}

/// Trigger `shutdown` on the first termination signal.
pub async fn trigger_on_signal(shutdown: &Shutdown) {
    wait_for_termination().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}
