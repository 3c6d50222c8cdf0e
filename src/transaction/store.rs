//! Transaction stores the check loop sweeps.
//!
//! # Responsibilities
//! - Define the [`CheckableStore`] seam (open, close, check)
//! - Provide an in-memory store of prepared transactions
//!
//! # Design Decisions
//! - `check` decides per message under the map lock, then notifies the listener without it
//! - A message is discarded once it has been checked back `check_max` times
//! - Only messages older than `timeout` are checked back

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use uuid::Uuid;

use crate::transaction::listener::ResultListener;
use crate::transaction::types::{HalfMessage, TransactionError, TransactionResult};

/// Storage holding prepared transactions.
#[async_trait]
pub trait CheckableStore: Send + Sync {
    /// Acquire resources before the first check of a start cycle.
    async fn open(&self) -> TransactionResult<()>;

    /// Release resources after the last check of a start cycle.
    async fn close(&self);

    /// Sweep prepared transactions and report decisions to `listener`.
    async fn check(
        &self,
        timeout: Duration,
        check_max: u32,
        listener: &dyn ResultListener,
    ) -> TransactionResult<()>;
}

/// In-memory store of prepared transactions.
#[derive(Debug, Default)]
pub struct MemoryTransactionStore {
    messages: DashMap<Uuid, HalfMessage>,
    open: AtomicBool,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Record a prepared transaction and return its id.
    pub fn prepare(&self, producer_group: &str, topic: &str) -> Uuid {
        let msg = HalfMessage::new(producer_group, topic);
        let id = msg.id;
        self.messages.insert(id, msg);
        id
    }

    /// Resolve a transaction as committed. Returns false if it was unknown.
    pub fn commit(&self, id: &Uuid) -> bool {
        self.messages.remove(id).is_some()
    }

    /// Resolve a transaction as rolled back. Returns false if it was unknown.
    pub fn rollback(&self, id: &Uuid) -> bool {
        self.messages.remove(id).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.messages.len()
    }

    pub fn get(&self, id: &Uuid) -> Option<HalfMessage> {
        self.messages.get(id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl CheckableStore for MemoryTransactionStore {
    async fn open(&self) -> TransactionResult<()> {
        if self.open.swap(true, Ordering::AcqRel) {
            return Err(TransactionError::State("store is already open".into()));
        }
        tracing::info!(pending = self.messages.len(), "Transaction store opened");
        Ok(())
    }

    async fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            tracing::info!(pending = self.messages.len(), "Transaction store closed");
        }
    }

    async fn check(
        &self,
        timeout: Duration,
        check_max: u32,
        listener: &dyn ResultListener,
    ) -> TransactionResult<()> {
        if !self.is_open() {
            return Err(TransactionError::State("store is not open".into()));
        }

        let now = Instant::now();
        let mut discards = Vec::new();
        let mut rechecks = Vec::new();

        self.messages.retain(|_, msg| {
            if msg.check_times >= check_max {
                discards.push(msg.clone());
                return false;
            }
            if now.saturating_duration_since(msg.prepared_at) >= timeout {
                msg.check_times += 1;
                rechecks.push(msg.clone());
            }
            true
        });

        tracing::debug!(
            pending = self.messages.len(),
            rechecks = rechecks.len(),
            discards = discards.len(),
            "Transaction sweep finished"
        );

        for msg in discards {
            listener.resolve_discard_message(msg).await;
        }
        for msg in rechecks {
            listener.resolve_half_message(msg).await;
        }

        Ok(())
    }
}
