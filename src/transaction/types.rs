//! Transaction message types and error definitions.

use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

/// Errors raised by check collaborators and the check service.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Underlying storage I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store was used in a state that does not allow the operation.
    #[error("Invalid store state: {0}")]
    State(String),

    /// A check cycle failed.
    #[error("Check failed: {0}")]
    Check(String),

    /// A check cycle panicked; the payload message is kept.
    #[error("Check panicked: {0}")]
    Panicked(String),
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// A prepared ("half") transactional message awaiting commit or rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HalfMessage {
    pub id: Uuid,
    pub producer_group: String,
    pub topic: String,
    pub prepared_at: Instant,
    /// Number of check-backs already issued for this message.
    pub check_times: u32,
}

impl HalfMessage {
    pub fn new(producer_group: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            producer_group: producer_group.into(),
            topic: topic.into(),
            prepared_at: Instant::now(),
            check_times: 0,
        }
    }
}

/// A resolution emitted by a check cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckEvent {
    /// Ask the producer group for the transaction's final state.
    Recheck(HalfMessage),
    /// Give up on the transaction after too many check-backs.
    Discard(HalfMessage),
}

impl CheckEvent {
    pub fn message(&self) -> &HalfMessage {
        match self {
            CheckEvent::Recheck(msg) | CheckEvent::Discard(msg) => msg,
        }
    }
}
