//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define check loop metrics (cycles, failures, latency, running state)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `txn_check_cycles_total` (counter): check cycles by outcome (ok, error, panic)
//! - `txn_check_duration_seconds` (histogram): time spent inside one check cycle
//! - `txn_check_service_running` (gauge): 1=started, 0=stopped
//! - `txn_check_resolutions_total` (counter): listener resolutions by kind (recheck, discard)

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Outcome label for a finished check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Ok,
    Error,
    Panic,
}

impl CycleOutcome {
    fn as_str(self) -> &'static str {
        match self {
            CycleOutcome::Ok => "ok",
            CycleOutcome::Error => "error",
            CycleOutcome::Panic => "panic",
        }
    }
}

pub fn record_check_cycle(outcome: CycleOutcome, elapsed: Duration) {
    counter!("txn_check_cycles_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("txn_check_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_service_running(running: bool) {
    gauge!("txn_check_service_running").set(if running { 1.0 } else { 0.0 });
}

pub fn record_resolution(kind: &'static str) {
    counter!("txn_check_resolutions_total", "kind" => kind).increment(1);
}
