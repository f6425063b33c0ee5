//! Klaxon Core - alert correlation and alarm lifecycle engine
//!
//! This crate decides whether each inbound monitoring event is a
//! brand-new problem, a repeat of an existing one, or a change to a
//! related one, and drives the bounded alarm lifecycle
//! (open → acknowledged → closed, with shelving, blackout suppression
//! and auto-expiry). The implementation prioritizes:
//!
//! 1. **Correctness** - at most one current record per matching key,
//!    even under concurrent writers
//! 2. **Logging** - every decision point logged with full context
//! 3. **Auditability** - an append-only, size-bounded history per record
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `pipeline` - ingestion engine, operator actions, housekeeping
//! - `model` - severity/status vocabulary, alerts, problem records
//! - `state` - the pure alarm state machine
//! - `correlate` - duplicate/correlated/new classification
//! - `suppression` - blackout windows
//! - `storage` - persistence contract and in-memory reference backend
//! - `hooks` - pre/post-receive plugin points
//! - `logging` - structured logging with receive context
//!
//! The HTTP surface, auth, webhook adapters and notification delivery
//! live in separate crates that consume this engine.

pub mod config;
pub mod correlate;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod suppression;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use hooks::{Plugin, PreReceive};
pub use model::{
    Action, Alert, ChangeType, HistoryEntry, ProblemRecord, Severity, Status, TrendIndication,
};
pub use pipeline::{Engine, HousekeepingReport, IngestOutcome};
pub use storage::{MemoryStore, Store};
pub use suppression::Blackout;

/// Initialize the process-wide logger.
///
/// Idempotent; embedding hosts that configure their own `log`
/// implementation can skip this.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}
