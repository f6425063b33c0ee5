//! Engine configuration.
//!
//! All tunables are explicit fields passed into `Engine::new`. Nothing in
//! the crate reads process-wide mutable state.

use crate::model::{Severity, Status};

/// Configuration for the ingestion engine and state machine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Severity that closes an alert when received (the "all clear" level).
    pub normal_severity: Severity,
    /// Placeholder previous severity for brand-new records.
    pub default_previous_severity: Severity,
    /// Status assigned to brand-new records before the state machine runs.
    pub default_status: Status,
    /// Maximum history entries kept per record; oldest evicted first.
    pub history_limit: usize,
    /// Timeout in seconds applied when the event does not carry one.
    /// Zero means the record never auto-expires.
    pub default_timeout_secs: u32,
    /// How many times a write is reclassified after losing a race to a
    /// concurrent writer before giving up with a conflict error.
    pub max_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            normal_severity: Severity::Normal,
            default_previous_severity: Severity::Indeterminate,
            default_status: Status::Open,
            history_limit: 100,
            default_timeout_secs: 86_400,
            max_conflict_retries: 3,
        }
    }
}
