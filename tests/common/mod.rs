//! Shared test collaborators that record every call they receive.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use txn_check_service::config::TransactionConfig;
use txn_check_service::transaction::{
    CheckableStore, HalfMessage, ResultListener, TransactionError, TransactionResult,
};

/// One observed collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open,
    CheckStarted { timeout: Duration, check_max: u32 },
    CheckFinished,
    Close,
    ListenerShutdown,
}

/// Ordered log shared by the store and listener of one test.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn checks(&self) -> usize {
        self.count(|c| matches!(c, Call::CheckStarted { .. }))
    }
}

/// Store whose failures are scripted by check number (1-based).
#[derive(Default)]
pub struct RecordingStore {
    log: CallLog,
    check_calls: AtomicUsize,
    failing_checks: HashSet<usize>,
    panicking_checks: HashSet<usize>,
    check_delay: Option<Duration>,
    open_delay: Option<Duration>,
    open_failures: AtomicUsize,
    open_panics: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn fail_check_on(mut self, call: usize) -> Self {
        self.failing_checks.insert(call);
        self
    }

    pub fn panic_check_on(mut self, call: usize) -> Self {
        self.panicking_checks.insert(call);
        self
    }

    pub fn with_check_delay(mut self, delay: Duration) -> Self {
        self.check_delay = Some(delay);
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn fail_next_opens(self, count: usize) -> Self {
        self.open_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn panic_next_opens(self, count: usize) -> Self {
        self.open_panics.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl CheckableStore for RecordingStore {
    async fn open(&self) -> TransactionResult<()> {
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        let panics = self.open_panics.load(Ordering::SeqCst);
        if panics > 0 {
            self.open_panics.store(panics - 1, Ordering::SeqCst);
            panic!("scripted panic on open");
        }
        let remaining = self.open_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.open_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(TransactionError::State("scripted open failure".into()));
        }
        self.log.push(Call::Open);
        Ok(())
    }

    async fn close(&self) {
        self.log.push(Call::Close);
    }

    async fn check(
        &self,
        timeout: Duration,
        check_max: u32,
        _listener: &dyn ResultListener,
    ) -> TransactionResult<()> {
        let call = self.check_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.push(Call::CheckStarted { timeout, check_max });

        if let Some(delay) = self.check_delay {
            tokio::time::sleep(delay).await;
        }
        self.log.push(Call::CheckFinished);

        if self.panicking_checks.contains(&call) {
            panic!("scripted panic on check {}", call);
        }
        if self.failing_checks.contains(&call) {
            return Err(TransactionError::Check(format!("scripted failure on check {}", call)));
        }
        Ok(())
    }
}

/// Listener that only records its shutdown.
pub struct RecordingListener {
    log: CallLog,
}

impl RecordingListener {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl ResultListener for RecordingListener {
    async fn resolve_half_message(&self, _msg: HalfMessage) {}

    async fn resolve_discard_message(&self, _msg: HalfMessage) {}

    async fn shutdown(&self) {
        self.log.push(Call::ListenerShutdown);
    }
}

/// Transaction settings with millisecond values.
pub fn txn_config(check_interval_ms: u64, timeout_ms: u64, check_max: u32) -> TransactionConfig {
    TransactionConfig {
        timeout_ms,
        check_max,
        check_interval_ms,
        shutdown_join_timeout_ms: 90_000,
    }
}
