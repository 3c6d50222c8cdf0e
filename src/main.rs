//! Transaction check daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                        txn-check                             │
//!   │                                                              │
//!   │  config file ──▶ loader ──▶ SharedConfig ◀── watcher/SIGHUP  │
//!   │                                 │                            │
//!   │                                 ▼                            │
//!   │                  ┌──────────────────────────┐                │
//!   │                  │ TransactionCheckService  │                │
//!   │                  │  sleep ▶ check ▶ repeat  │                │
//!   │                  └────────────┬─────────────┘                │
//!   │                               ▼                              │
//!   │     MemoryTransactionStore ──▶ ChannelCheckListener ──▶ log  │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use txn_check_service::config::{load_config, BrokerConfig, ConfigWatcher, SharedConfig};
use txn_check_service::lifecycle::{next_signal, ProcessSignal, Shutdown};
use txn_check_service::observability::{logging, metrics};
use txn_check_service::transaction::{
    ChannelCheckListener, CheckEvent, MemoryTransactionStore, TransactionCheckService,
};

#[derive(Parser)]
#[command(name = "txn-check")]
#[command(about = "Periodic transaction status checker", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the config file when it changes on disk.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BrokerConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("txn-check v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        timeout_ms = config.transaction.timeout_ms,
        check_max = config.transaction.check_max,
        check_interval_ms = config.transaction.check_interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shared = Arc::new(SharedConfig::new(config));
    let reloader = cli.config.as_ref().map(|path| ConfigWatcher::new(path, shared.clone()));

    // Keep the watcher alive for the lifetime of the process.
    let _watch_handle = match (&reloader, cli.watch) {
        (Some(reloader), true) => Some(reloader.watch()?),
        _ => None,
    };

    let shutdown = Shutdown::new();
    let store = Arc::new(MemoryTransactionStore::new());
    let (listener, mut events) = ChannelCheckListener::new();

    let mut consumer_shutdown = shutdown.subscribe();
    let consumer = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => log_event(event),
                    None => break,
                },
                _ = consumer_shutdown.recv() => {
                    // Events queued before the listener stopped accepting.
                    while let Ok(event) = events.try_recv() {
                        log_event(event);
                    }
                    break;
                }
            }
        }
        tracing::debug!("Check event consumer stopped");
    });

    let service = TransactionCheckService::new(shared.clone(), store.clone(), Arc::new(listener));
    service.start().await?;

    loop {
        match next_signal().await {
            ProcessSignal::Terminate => break,
            ProcessSignal::Reload => {
                if let Some(reloader) = &reloader {
                    if let Err(e) = reloader.reload() {
                        tracing::error!(error = %e, "Reload failed, keeping current configuration");
                        continue;
                    }
                }
                tracing::info!("Restarting {} with current configuration", service.service_name());
                service.shutdown().await;
                if let Err(e) = service.start().await {
                    tracing::error!(
                        service = service.service_name(),
                        error = %e,
                        "Restart failed, waiting for the next signal"
                    );
                }
            }
        }
    }

    service.shutdown().await;
    shutdown.trigger();
    let _ = consumer.await;

    tracing::info!(pending = store.pending_count(), "Shutdown complete");
    Ok(())
}

fn log_event(event: CheckEvent) {
    match event {
        CheckEvent::Recheck(msg) => tracing::info!(
            msg_id = %msg.id,
            producer_group = %msg.producer_group,
            topic = %msg.topic,
            check_times = msg.check_times,
            "Transaction check-back requested"
        ),
        CheckEvent::Discard(msg) => tracing::warn!(
            msg_id = %msg.id,
            producer_group = %msg.producer_group,
            topic = %msg.topic,
            "Transaction discarded"
        ),
    }
}
