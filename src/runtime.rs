//! Runtime - process signals for the interactive loop

use tracing::{info, warn};

/// Resolves on the first SIGINT or SIGTERM (Ctrl+C off unix).
///
/// When no handler can be installed the future stays pending; `quit` and end
/// of input still stop the loop.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Signal handlers unavailable: {}", e);
                return std::future::pending().await;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl+C handler unavailable: {}", e);
            return std::future::pending().await;
        }
        info!("Received Ctrl+C");
    }
}
