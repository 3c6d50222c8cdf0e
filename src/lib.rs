//! Transaction check service for a messaging broker.
//!
//! A background loop that periodically asks a transaction store to check
//! prepared transactions, with idempotent start/shutdown and ordered teardown.

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod transaction;

pub use config::{BrokerConfig, ConfigProvider, SharedConfig};
pub use lifecycle::ServiceThread;
pub use transaction::{CheckableStore, ResultListener, TransactionCheckService};
