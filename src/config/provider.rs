//! Runtime access to the transaction check settings.
//!
//! # Responsibilities
//! - Define the [`ConfigProvider`] seam the check loop reads from
//! - Hold the live, swappable configuration for hot reload
//! - Snapshot polling parameters once per loop start
//!
//! # Design Decisions
//! - Lock-free reads via `ArcSwap`; a reload replaces the whole config
//! - The loop snapshots parameters at entry, so reloads apply on the next start

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::config::schema::{BrokerConfig, TransactionConfig};

/// Floor applied to a zero check interval so the loop cannot spin.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

/// Source of the transaction check settings.
pub trait ConfigProvider: Send + Sync {
    fn transaction_timeout(&self) -> Duration;

    fn transaction_check_max(&self) -> u32;

    fn transaction_check_interval(&self) -> Duration;

    /// Upper bound on how long shutdown waits for an in-flight cycle.
    fn shutdown_join_timeout(&self) -> Duration {
        Duration::from_secs(90)
    }
}

impl ConfigProvider for TransactionConfig {
    fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn transaction_check_max(&self) -> u32 {
        self.check_max
    }

    fn transaction_check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    fn shutdown_join_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_join_timeout_ms)
    }
}

/// Live configuration shared between the reload path and the services.
#[derive(Debug)]
pub struct SharedConfig {
    inner: ArcSwap<BrokerConfig>,
}

impl SharedConfig {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            inner: ArcSwap::from_pointee(config),
        }
    }

    /// Current configuration.
    pub fn load(&self) -> Arc<BrokerConfig> {
        self.inner.load_full()
    }

    /// Replace the configuration. Running loops keep their snapshot.
    pub fn store(&self, config: BrokerConfig) {
        self.inner.store(Arc::new(config));
    }
}

impl ConfigProvider for SharedConfig {
    fn transaction_timeout(&self) -> Duration {
        self.inner.load().transaction.transaction_timeout()
    }

    fn transaction_check_max(&self) -> u32 {
        self.inner.load().transaction.check_max
    }

    fn transaction_check_interval(&self) -> Duration {
        self.inner.load().transaction.transaction_check_interval()
    }

    fn shutdown_join_timeout(&self) -> Duration {
        self.inner.load().transaction.shutdown_join_timeout()
    }
}

/// Check loop parameters, read once when the loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingParameters {
    pub timeout: Duration,
    pub check_max: u32,
    pub check_interval: Duration,
}

impl PollingParameters {
    pub fn snapshot(provider: &dyn ConfigProvider) -> Self {
        let timeout = provider.transaction_timeout();
        let check_max = provider.transaction_check_max();
        let mut check_interval = provider.transaction_check_interval();

        if check_interval < MIN_CHECK_INTERVAL {
            tracing::warn!(
                check_interval_ms = check_interval.as_millis() as u64,
                "Transaction check interval must be positive, clamping to 1ms"
            );
            check_interval = MIN_CHECK_INTERVAL;
        }

        Self {
            timeout,
            check_max,
            check_interval,
        }
    }
}
