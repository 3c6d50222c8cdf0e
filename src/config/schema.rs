//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the check service.
//! All types derive Serde traits for deserialization from config files.

use serde::Deserialize;

/// Root configuration for the broker's transaction checker.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct BrokerConfig {
    /// Transaction check loop settings.
    pub transaction: TransactionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Transaction check loop settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransactionConfig {
    /// Age in milliseconds after which a prepared transaction is checked back.
    pub timeout_ms: u64,

    /// Number of check-backs before a prepared transaction is discarded.
    pub check_max: u32,

    /// Pause between check cycles in milliseconds.
    pub check_interval_ms: u64,

    /// How long shutdown waits for an in-flight cycle, in milliseconds.
    pub shutdown_join_timeout_ms: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 6_000,
            check_max: 15,
            check_interval_ms: 60_000,
            shutdown_join_timeout_ms: 90_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
