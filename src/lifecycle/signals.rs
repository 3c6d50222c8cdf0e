//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to internal events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP requests a reload, not a shutdown
//! - A handler that fails to install is logged and never fires

/// Process-level event derived from an OS signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSignal {
    /// SIGINT or SIGTERM.
    Terminate,
    /// SIGHUP.
    Reload,
}

/// Wait for the next signal of interest.
pub async fn next_signal() -> ProcessSignal {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let (terminate, hangup) = {
        use tokio::signal::unix::{signal, SignalKind};

        let terminate = async {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };
        let hangup = async {
            match signal(SignalKind::hangup()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGHUP handler");
                    std::future::pending::<()>().await;
                }
            }
        };
        (terminate, hangup)
    };

    #[cfg(not(unix))]
    let (terminate, hangup) = (std::future::pending::<()>(), std::future::pending::<()>());

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C");
            ProcessSignal::Terminate
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM");
            ProcessSignal::Terminate
        }
        _ = hangup => {
            tracing::info!("Received SIGHUP");
            ProcessSignal::Reload
        }
    }
}
