//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BrokerConfig (validated, immutable)
//!     → provider.rs SharedConfig (ArcSwap) read by services
//!
//! On file change or SIGHUP:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap inside SharedConfig
//!     → check loop picks it up on its next start
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod provider;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use provider::{ConfigProvider, PollingParameters, SharedConfig};
pub use schema::{BrokerConfig, ObservabilityConfig, TransactionConfig};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
