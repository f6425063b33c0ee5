//! Typed error taxonomy for the engine.
//!
//! Every failure surfaced to callers is one of these variants. Hook
//! rejections are a normal "alert not accepted" outcome and are kept
//! distinct from hook crashes, which are wrapped as `HookFailure`.

use thiserror::Error;

use crate::storage::StoreError;

/// Errors returned by the ingestion pipeline and operator-action paths.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input event. Rejected before classification, no side effects.
    #[error("invalid alert: {0}")]
    Validation(String),

    /// Operator action not permitted from the record's current status.
    #[error("{0}")]
    InvalidAction(String),

    /// Concurrent writers kept winning the race on the same matching key.
    #[error("too many concurrent writes: {0}")]
    Conflict(String),

    /// Action targeted a non-existent id, or a short-id prefix matched
    /// more than one record.
    #[error("alert not found: {0}")]
    NotFound(String),

    /// Persistence timed out or is unreachable. Transient; never means
    /// "no duplicate/correlation found".
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A pre-receive hook deliberately rejected the alert.
    #[error("alert rejected: {0}")]
    Rejected(String),

    /// A hook blew up. Wrapped so nothing crosses the plugin boundary
    /// undetected.
    #[error("plugin hook failed: {0}")]
    HookFailure(anyhow::Error),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => EngineError::StoreUnavailable(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
