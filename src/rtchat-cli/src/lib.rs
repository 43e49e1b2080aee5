//! rtchat CLI library module.
//!
//! - `cli/` - Argument parsing and command dispatch
//! - `logging` - Subscriber setup and level resolution
//! - Interrupt handling that routes Ctrl+C into session shutdown

pub mod cli;
pub mod logging;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `shutdown` on the first Ctrl+C (or SIGTERM on Unix).
///
/// Must be called from inside the runtime.
pub fn install_interrupt_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
            _ = terminate => info!("Received SIGTERM, shutting down"),
            _ = shutdown.cancelled() => return,
        }
        shutdown.cancel();
    });
}
