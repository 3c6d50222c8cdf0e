//! Background execution unit for long-running service loops.
//!
//! # Responsibilities
//! - Own the tokio task that runs a [`ServiceLoop`]
//! - Deliver stop requests and wakeups to the running loop
//! - Join the task on shutdown with a bounded wait
//!
//! # Design Decisions
//! - A fresh stop channel per start, so a stopped unit can be started again
//! - Stopping is cooperative: loops poll [`StopSignal`] and every wait is cancellable
//! - A wakeup sent while the loop is busy is kept and consumed by the next wait

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

/// A loop body driven by a [`ServiceThread`].
#[async_trait]
pub trait ServiceLoop: Send + Sync + 'static {
    /// Name used in logs.
    fn service_name(&self) -> &str;

    /// Loop entry point. Must return once `signal` reports a stop.
    async fn run(&self, signal: StopSignal);
}

/// Why a [`StopSignal::wait_for_running`] call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full interval elapsed.
    Elapsed,
    /// A wakeup cut the wait short.
    Woken,
    /// Stop was requested (or the owning unit went away).
    Stopped,
}

/// The loop's view of its owning [`ServiceThread`].
#[derive(Debug, Clone)]
pub struct StopSignal {
    stop_rx: watch::Receiver<bool>,
    wakeup: Arc<Notify>,
}

impl StopSignal {
    /// Whether stop has been requested.
    pub fn is_stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Sleep for `interval`, returning early on stop or wakeup.
    pub async fn wait_for_running(&mut self, interval: Duration) -> WaitOutcome {
        if self.is_stopped() {
            return WaitOutcome::Stopped;
        }

        tokio::select! {
            biased;
            // A dropped sender means the unit is gone; treat it as a stop.
            _ = self.stop_rx.wait_for(|stopped| *stopped) => WaitOutcome::Stopped,
            _ = self.wakeup.notified() => WaitOutcome::Woken,
            _ = tokio::time::sleep(interval) => WaitOutcome::Elapsed,
        }
    }
}

/// Result of [`ServiceThread::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Nothing was running.
    NotRunning,
    /// The loop returned on its own after the stop request.
    Joined,
    /// The loop task panicked or was cancelled.
    Failed,
    /// The loop did not return within the join timeout and was aborted.
    TimedOut,
}

/// Owns at most one running loop task at a time.
#[derive(Debug)]
pub struct ServiceThread {
    name: String,
    stop_tx: Option<watch::Sender<bool>>,
    wakeup: Option<Arc<Notify>>,
    handle: Option<JoinHandle<()>>,
}

impl ServiceThread {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stop_tx: None,
            wakeup: None,
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a loop task exists and has not returned yet.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn `service` on the current runtime.
    ///
    /// Returns `false` without spawning if a loop is already running.
    pub fn start<L: ServiceLoop>(&mut self, service: Arc<L>) -> bool {
        if self.is_running() {
            tracing::warn!(service = %self.name, "Service thread already running");
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let wakeup = Arc::new(Notify::new());
        let signal = StopSignal {
            stop_rx,
            wakeup: wakeup.clone(),
        };

        tracing::debug!(thread = %self.name, service = %service.service_name(), "Spawning service loop");
        let handle = tokio::spawn(async move {
            service.run(signal).await;
        });

        self.stop_tx = Some(stop_tx);
        self.wakeup = Some(wakeup);
        self.handle = Some(handle);
        true
    }

    /// Ask the loop to stop without waiting for it.
    pub fn request_stop(&self) {
        if let Some(stop_tx) = &self.stop_tx {
            stop_tx.send_replace(true);
        }
    }

    /// Cut the loop's current (or next) wait short.
    pub fn wakeup(&self) {
        if let Some(wakeup) = &self.wakeup {
            wakeup.notify_one();
        }
    }

    /// Request a stop and wait up to `join_timeout` for the loop to return.
    pub async fn shutdown(&mut self, join_timeout: Duration) -> JoinOutcome {
        self.request_stop();
        self.wakeup = None;

        let Some(mut handle) = self.handle.take() else {
            self.stop_tx = None;
            return JoinOutcome::NotRunning;
        };

        let outcome = match tokio::time::timeout(join_timeout, &mut handle).await {
            Ok(Ok(())) => JoinOutcome::Joined,
            Ok(Err(e)) => {
                tracing::error!(service = %self.name, error = %e, "Service thread terminated abnormally");
                JoinOutcome::Failed
            }
            Err(_) => {
                tracing::warn!(
                    service = %self.name,
                    join_timeout_ms = join_timeout.as_millis() as u64,
                    "Service thread did not stop in time, aborting"
                );
                handle.abort();
                JoinOutcome::TimedOut
            }
        };

        self.stop_tx = None;
        outcome
    }
}

impl Drop for ServiceThread {
    fn drop(&mut self) {
        self.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Ticker {
        interval: Duration,
        ticks: AtomicUsize,
        woken: AtomicUsize,
        block_for: Option<Duration>,
    }

    impl Ticker {
        fn new(interval: Duration) -> Self {
            Self {
                interval,
                ticks: AtomicUsize::new(0),
                woken: AtomicUsize::new(0),
                block_for: None,
            }
        }
    }

    #[async_trait]
    impl ServiceLoop for Ticker {
        fn service_name(&self) -> &str {
            "ticker"
        }

        async fn run(&self, mut signal: StopSignal) {
            while !signal.is_stopped() {
                match signal.wait_for_running(self.interval).await {
                    WaitOutcome::Stopped => break,
                    WaitOutcome::Woken => {
                        self.woken.fetch_add(1, Ordering::SeqCst);
                    }
                    WaitOutcome::Elapsed => {}
                }
                if let Some(block) = self.block_for {
                    tokio::time::sleep(block).await;
                }
                self.ticks.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_stopped() {
        let ticker = Arc::new(Ticker::new(Duration::from_millis(100)));
        let mut thread = ServiceThread::new("ticker");

        assert!(thread.start(ticker.clone()));
        assert!(thread.is_running());

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(ticker.ticks.load(Ordering::SeqCst), 3);

        assert_eq!(thread.shutdown(Duration::from_secs(1)).await, JoinOutcome::Joined);
        assert!(!thread.is_running());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(ticker.ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cuts_sleep_short() {
        let ticker = Arc::new(Ticker::new(Duration::from_secs(3600)));
        let mut thread = ServiceThread::new("ticker");
        thread.start(ticker.clone());

        let started = tokio::time::Instant::now();
        assert_eq!(thread.shutdown(Duration::from_secs(1)).await, JoinOutcome::Joined);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(ticker.ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_is_rejected() {
        let ticker = Arc::new(Ticker::new(Duration::from_secs(1)));
        let mut thread = ServiceThread::new("ticker");

        assert!(thread.start(ticker.clone()));
        assert!(!thread.start(ticker.clone()));

        thread.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_shutdown() {
        let ticker = Arc::new(Ticker::new(Duration::from_millis(100)));
        let mut thread = ServiceThread::new("ticker");

        thread.start(ticker.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;
        thread.shutdown(Duration::from_secs(1)).await;

        assert!(thread.start(ticker.clone()));
        tokio::time::sleep(Duration::from_millis(150)).await;
        thread.shutdown(Duration::from_secs(1)).await;

        assert_eq!(ticker.ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wakeup_runs_early_tick() {
        let ticker = Arc::new(Ticker::new(Duration::from_secs(3600)));
        let mut thread = ServiceThread::new("ticker");
        thread.start(ticker.clone());

        tokio::time::sleep(Duration::from_millis(10)).await;
        thread.wakeup();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(ticker.ticks.load(Ordering::SeqCst), 1);
        assert_eq!(ticker.woken.load(Ordering::SeqCst), 1);

        thread.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_times_out_on_stuck_loop() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        ticker.block_for = Some(Duration::from_secs(3600));
        let ticker = Arc::new(ticker);
        let mut thread = ServiceThread::new("ticker");
        thread.start(ticker.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let outcome = thread.shutdown(Duration::from_millis(200)).await;

        assert_eq!(outcome, JoinOutcome::TimedOut);
        assert_eq!(ticker.ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_without_start() {
        let mut thread = ServiceThread::new("idle");
        assert_eq!(thread.shutdown(Duration::from_secs(1)).await, JoinOutcome::NotRunning);
    }
}
