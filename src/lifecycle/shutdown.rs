//! Shutdown coordination for the daemon's auxiliary tasks.
//!
//! The check loop has its own stop signal inside [`ServiceThread`]; this
//! coordinator is for the tasks around it (event consumers, reload relays)
//! that must stop once the process is going down.
//!
//! [`ServiceThread`]: crate::lifecycle::ServiceThread

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Every long-running task holds a [`ShutdownListener`] obtained from
/// [`subscribe`](Self::subscribe).
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
            triggered: false,
        }
    }

    /// Tell every subscriber to stop.
    pub fn trigger(&self) {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::debug!(subscribers = notified, "Shutdown triggered");
    }

    /// Number of tasks still holding a listener.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// One task's view of the [`Shutdown`] coordinator.
#[derive(Debug)]
pub struct ShutdownListener {
    rx: broadcast::Receiver<()>,
    triggered: bool,
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Wait until shutdown is triggered or the coordinator is dropped.
    pub async fn recv(&mut self) {
        if self.triggered {
            return;
        }
        // Lagged and Closed both mean a trigger happened or can no longer happen.
        let _ = self.rx.recv().await;
        self.triggered = true;
    }
}
