//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Service threads (service_thread.rs):
//!     start → spawn loop task → loop polls StopSignal
//!     shutdown → request stop → join with timeout
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → terminate the process
//!     SIGHUP → restart background services with fresh config
//!
//! Auxiliary tasks (shutdown.rs):
//!     Shutdown::trigger → every ShutdownListener::recv returns
//! ```
//!
//! # Design Decisions
//! - Loops are stopped cooperatively, never killed mid-operation unless the join deadline passes
//! - A service thread can be started again after it has been shut down

pub mod service_thread;
pub mod shutdown;
pub mod signals;

pub use service_thread::{JoinOutcome, ServiceLoop, ServiceThread, StopSignal, WaitOutcome};
pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::{next_signal, ProcessSignal};
