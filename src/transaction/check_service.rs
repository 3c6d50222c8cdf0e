//! Periodic transaction check service.
//!
//! # Responsibilities
//! - Start and stop the check loop idempotently under concurrent callers
//! - Open the store before the loop runs, close it and the listener after it stops
//! - Run one check cycle per interval and survive any failure inside it
//!
//! # Lifecycle
//! ```text
//! start():    started false → true, store.open(), listener.start(), spawn loop
//! shutdown(): started true → false, stop + join loop, store.close(), listener.shutdown()
//! ```
//!
//! # Design Decisions
//! - The `started` flag is flipped with compare-and-set while holding the
//!   service thread lock, so a shutdown can never close a store whose open is
//!   still in progress
//! - Shutdown joins the loop before closing the store; an in-flight check
//!   finishes first unless the join timeout expires
//! - Transitions run on a spawned task, so a caller that gives up waiting
//!   (timeout, `select!`) cannot leave the flag set without a loop
//! - Polling parameters are read once per start

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::Mutex;

use crate::config::provider::{ConfigProvider, PollingParameters};
use crate::lifecycle::service_thread::{JoinOutcome, ServiceLoop, ServiceThread, StopSignal, WaitOutcome};
use crate::observability::metrics::{self, CycleOutcome};
use crate::transaction::listener::ResultListener;
use crate::transaction::store::CheckableStore;
use crate::transaction::types::{TransactionError, TransactionResult};

pub const SERVICE_NAME: &str = "TransactionCheckService";

/// Counters for finished check cycles since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub succeeded: u64,
    pub failed: u64,
}

/// Background service that periodically asks the store to check transactions.
pub struct TransactionCheckService {
    core: Arc<ServiceCore>,
}

impl TransactionCheckService {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        store: Arc<dyn CheckableStore>,
        listener: Arc<dyn ResultListener>,
    ) -> Self {
        Self {
            core: Arc::new(ServiceCore {
                checker: Arc::new(CheckLoop {
                    config,
                    store,
                    listener,
                    succeeded: AtomicU64::new(0),
                    failed: AtomicU64::new(0),
                }),
                started: AtomicBool::new(false),
                thread: Mutex::new(ServiceThread::new(SERVICE_NAME)),
            }),
        }
    }

    pub fn service_name(&self) -> &'static str {
        SERVICE_NAME
    }

    pub fn is_started(&self) -> bool {
        self.core.started.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> CycleStats {
        CycleStats {
            succeeded: self.core.checker.succeeded.load(Ordering::Relaxed),
            failed: self.core.checker.failed.load(Ordering::Relaxed),
        }
    }

    /// Open the store and launch the check loop.
    ///
    /// Returns `Ok(true)` if this call started the service and `Ok(false)` if
    /// it was already started. If the store fails to open, the service stays
    /// stopped and the error is returned.
    ///
    /// The transition runs on its own task: dropping the returned future does
    /// not abandon a half-finished start.
    pub async fn start(&self) -> TransactionResult<bool> {
        let core = self.core.clone();
        match tokio::spawn(async move { core.start().await }).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(TransactionError::Panicked(panic_message(e.into_panic().as_ref()))),
            Err(e) => Err(TransactionError::State(e.to_string())),
        }
    }

    /// Stop the loop, then close the store and shut down the listener.
    ///
    /// Returns `true` if this call stopped a started service. Like
    /// [`start`](Self::start), the teardown completes even if the caller stops
    /// waiting for it.
    pub async fn shutdown(&self) -> bool {
        let core = self.core.clone();
        match tokio::spawn(async move { core.shutdown().await }).await {
            Ok(stopped) => stopped,
            Err(e) => {
                // Only a collaborator can panic here, after the flag was cleared.
                tracing::error!(service = SERVICE_NAME, error = %e, "Shutdown did not complete");
                true
            }
        }
    }

    /// Run a check cycle now instead of waiting for the interval.
    pub async fn wakeup(&self) {
        if self.is_started() {
            self.core.thread.lock().await.wakeup();
        }
    }
}

/// Lifecycle state shared with the tasks that perform transitions.
struct ServiceCore {
    checker: Arc<CheckLoop>,
    started: AtomicBool,
    thread: Mutex<ServiceThread>,
}

impl ServiceCore {
    async fn start(&self) -> TransactionResult<bool> {
        let mut thread = self.thread.lock().await;

        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(service = SERVICE_NAME, "Already started");
            return Ok(false);
        }
        let rollback = StartRollback::new(&self.started);

        if let Err(e) = self.checker.store.open().await {
            tracing::error!(service = SERVICE_NAME, error = %e, "Failed to open transaction store");
            return Err(e);
        }
        self.checker.listener.start().await;

        if !thread.start(self.checker.clone()) {
            self.checker.store.close().await;
            self.checker.listener.shutdown().await;
            return Err(TransactionError::State(format!(
                "{} loop is still running",
                thread.name()
            )));
        }
        rollback.commit();

        metrics::record_service_running(true);
        tracing::info!(service = SERVICE_NAME, "Service started");
        Ok(true)
    }

    async fn shutdown(&self) -> bool {
        let mut thread = self.thread.lock().await;

        if self
            .started
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(service = SERVICE_NAME, "Not started, nothing to shut down");
            return false;
        }

        let join_timeout = self.checker.config.shutdown_join_timeout();
        if thread.shutdown(join_timeout).await == JoinOutcome::TimedOut {
            tracing::warn!(service = SERVICE_NAME, "Closing store while a check cycle may still be running");
        }

        self.checker.store.close().await;
        self.checker.listener.shutdown().await;

        metrics::record_service_running(false);
        tracing::info!(service = SERVICE_NAME, "Service shut down");
        true
    }
}

/// Clears the `started` flag on drop unless the start went through.
struct StartRollback<'a> {
    started: &'a AtomicBool,
    armed: bool,
}

impl<'a> StartRollback<'a> {
    fn new(started: &'a AtomicBool) -> Self {
        Self { started, armed: true }
    }

    fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for StartRollback<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.started.store(false, Ordering::Release);
        }
    }
}

struct CheckLoop {
    config: Arc<dyn ConfigProvider>,
    store: Arc<dyn CheckableStore>,
    listener: Arc<dyn ResultListener>,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl CheckLoop {
    async fn run_cycle(&self, params: &PollingParameters) {
        let started = Instant::now();
        let cycle = self
            .store
            .check(params.timeout, params.check_max, self.listener.as_ref());

        let result = match AssertUnwindSafe(cycle).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(TransactionError::Panicked(panic_message(payload.as_ref()))),
        };
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                metrics::record_check_cycle(CycleOutcome::Ok, elapsed);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                let outcome = match &e {
                    TransactionError::Panicked(_) => CycleOutcome::Panic,
                    _ => CycleOutcome::Error,
                };
                metrics::record_check_cycle(outcome, elapsed);
                tracing::error!(service = SERVICE_NAME, error = %e, "Transaction check cycle failed");
            }
        }
    }
}

#[async_trait]
impl ServiceLoop for CheckLoop {
    fn service_name(&self) -> &str {
        SERVICE_NAME
    }

    async fn run(&self, mut signal: StopSignal) {
        tracing::info!(service = SERVICE_NAME, "Start transaction service thread");

        let params = PollingParameters::snapshot(self.config.as_ref());
        tracing::info!(
            check_max = params.check_max,
            timeout_ms = params.timeout.as_millis() as u64,
            interval_ms = params.check_interval.as_millis() as u64,
            "Check parameters"
        );

        while !signal.is_stopped() {
            if signal.wait_for_running(params.check_interval).await == WaitOutcome::Stopped {
                break;
            }
            self.run_cycle(&params).await;
        }

        tracing::info!(service = SERVICE_NAME, "End transaction service thread");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_rollback_resets_flag_unless_committed() {
        let started = AtomicBool::new(true);
        drop(StartRollback::new(&started));
        assert!(!started.load(Ordering::SeqCst));

        started.store(true, Ordering::SeqCst);
        StartRollback::new(&started).commit();
        assert!(started.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
