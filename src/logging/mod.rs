//! Structured logging with receive context.
//!
//! Provides a log-line prefix carrying receive_id and alert_id so every
//! decision an ingest makes can be correlated afterwards.

pub mod structured;

pub use structured::*;
