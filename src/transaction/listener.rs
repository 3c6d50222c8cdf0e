//! Check result listeners.
//!
//! # Responsibilities
//! - Define the [`ResultListener`] seam a check cycle reports into
//! - Forward resolutions to a consumer over a channel
//!
//! # Design Decisions
//! - Callbacks are infallible; delivery problems are logged, never raised into the sweep
//! - After `shutdown` resolutions are dropped until the next `start`
//! - The event stream ends when the listener itself is dropped

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::observability::metrics;
use crate::transaction::types::{CheckEvent, HalfMessage};

/// Receives the outcome of each check cycle.
#[async_trait]
pub trait ResultListener: Send + Sync {
    /// The transaction is still pending past its timeout; ask the producer.
    async fn resolve_half_message(&self, msg: HalfMessage);

    /// The transaction exceeded its check budget and is dropped.
    async fn resolve_discard_message(&self, msg: HalfMessage);

    /// Called once per service start, after the store has opened.
    async fn start(&self) {}

    /// Release listener resources. Called once per service shutdown.
    async fn shutdown(&self);
}

/// Listener that forwards every resolution as a [`CheckEvent`].
#[derive(Debug)]
pub struct ChannelCheckListener {
    tx: mpsc::UnboundedSender<CheckEvent>,
    accepting: AtomicBool,
}

impl ChannelCheckListener {
    /// Create a listener and the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CheckEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Self {
            tx,
            accepting: AtomicBool::new(true),
        };
        (listener, rx)
    }

    /// Whether resolutions are currently forwarded.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    fn forward(&self, event: CheckEvent) {
        if !self.is_accepting() {
            tracing::debug!(msg_id = %event.message().id, "Listener shut down, dropping check event");
            return;
        }

        if self.tx.send(event).is_err() {
            tracing::warn!("Check event consumer has gone away");
        }
    }
}

#[async_trait]
impl ResultListener for ChannelCheckListener {
    async fn resolve_half_message(&self, msg: HalfMessage) {
        metrics::record_resolution("recheck");
        self.forward(CheckEvent::Recheck(msg));
    }

    async fn resolve_discard_message(&self, msg: HalfMessage) {
        metrics::record_resolution("discard");
        tracing::warn!(
            msg_id = %msg.id,
            producer_group = %msg.producer_group,
            check_times = msg.check_times,
            "Discarding transaction after exhausting check-backs"
        );
        self.forward(CheckEvent::Discard(msg));
    }

    async fn start(&self) {
        if !self.accepting.swap(true, Ordering::AcqRel) {
            tracing::info!("Check listener resumed");
        }
    }

    async fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::AcqRel) {
            tracing::info!("Check listener shut down");
        }
    }
}
