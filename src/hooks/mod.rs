//! Plugin hook points.
//!
//! Plugins run synchronously, in registration order. `pre_receive` may
//! mutate the alert before classification or reject it outright;
//! `post_receive` observes the durable record. A rejection is a
//! first-class outcome distinct from a hook error.

use crate::model::{Alert, ProblemRecord};

/// Outcome of a pre-receive hook.
#[derive(Debug)]
pub enum PreReceive {
    /// Continue with this (possibly mutated) alert.
    Accept(Alert),
    /// Deliberately refuse the alert; ingestion stops with a
    /// caller-visible `Rejected` error.
    Reject(String),
}

/// A pipeline plugin. Hooks must not violate the at-most-one-current
/// invariant themselves; they only see the event before classification
/// and the record after the write.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn pre_receive(&self, alert: Alert) -> anyhow::Result<PreReceive> {
        Ok(PreReceive::Accept(alert))
    }

    fn post_receive(&self, _record: &ProblemRecord) -> anyhow::Result<()> {
        Ok(())
    }
}
