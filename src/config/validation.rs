//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals and limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BrokerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BrokerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("transaction.check_interval_ms must be greater than zero")]
    ZeroCheckInterval,

    #[error("transaction.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("transaction.check_max must be greater than zero")]
    ZeroCheckMax,

    #[error("transaction.shutdown_join_timeout_ms must be greater than zero")]
    ZeroJoinTimeout,

    #[error("observability.metrics_address '{0}' is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration for values the check service cannot run with.
pub fn validate_config(config: &BrokerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let txn = &config.transaction;

    if txn.check_interval_ms == 0 {
        errors.push(ValidationError::ZeroCheckInterval);
    }
    if txn.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if txn.check_max == 0 {
        errors.push(ValidationError::ZeroCheckMax);
    }
    if txn.shutdown_join_timeout_ms == 0 {
        errors.push(ValidationError::ZeroJoinTimeout);
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
