//! Transaction check subsystem.
//!
//! # Data Flow
//! ```text
//! TransactionCheckService (check_service.rs)
//!     every check interval
//!     → CheckableStore::check (store.rs)
//!         → ResultListener::resolve_half_message / resolve_discard_message (listener.rs)
//!
//! Failures inside a cycle are logged and counted; the loop keeps going.
//! ```
//!
//! # Design Decisions
//! - The service owns no check policy; the store decides, the listener acts
//! - Store and listener are trait objects so the broker can plug its own

pub mod check_service;
pub mod listener;
pub mod store;
pub mod types;

pub use check_service::{CycleStats, TransactionCheckService, SERVICE_NAME};
pub use listener::{ChannelCheckListener, ResultListener};
pub use store::{CheckableStore, MemoryTransactionStore};
pub use types::{CheckEvent, HalfMessage, TransactionError, TransactionResult};
