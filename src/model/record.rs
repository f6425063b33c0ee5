//! Durable problem records and their history log.
//!
//! A `ProblemRecord` is the current state of one logical problem. It is
//! created on the first event for a matching key and mutated in place by
//! every subsequent duplicate, correlation, operator action and
//! housekeeping sweep.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::model::alert::Alert;
use crate::model::severity::{Severity, TrendIndication};
use crate::model::status::Status;

/// Exact-duplicate matching key. At most one current record may exist per
/// key; the persistence layer enforces this with a uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub environment: String,
    pub resource: String,
    pub event: String,
    pub severity: Severity,
    pub customer: Option<String>,
}

/// Correlation matching key. Event-name membership in the record's
/// correlate set is checked on top of this.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub environment: String,
    pub resource: String,
    pub customer: Option<String>,
}

/// Kind of change a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Severity,
    Status,
    Action,
}

/// Immutable record of one change to a problem record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Id of the write that triggered the change.
    pub id: String,
    pub event: String,
    pub change_type: ChangeType,
    pub severity: Option<Severity>,
    pub status: Option<Status>,
    pub value: Option<String>,
    pub text: Option<String>,
    pub update_time: DateTime<Utc>,
    pub timeout: Option<u32>,
}

impl HistoryEntry {
    /// A new problem identity appeared (create or correlate).
    pub fn severity(
        id: &str,
        event: &str,
        severity: Severity,
        value: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_string(),
            event: event.to_string(),
            change_type: ChangeType::Severity,
            severity: Some(severity),
            status: None,
            value: Some(value.to_string()),
            text: Some(text.to_string()),
            update_time: at,
            timeout: None,
        }
    }

    /// A status transition with a human-readable reason.
    pub fn status(id: &str, event: &str, status: Status, text: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            event: event.to_string(),
            change_type: ChangeType::Status,
            severity: None,
            status: Some(status),
            value: None,
            text: Some(text.to_string()),
            update_time: at,
            timeout: None,
        }
    }

    /// An operator action and the status it produced. Housekeeping reads
    /// these to compute shelve-timeout deadlines.
    pub fn action(
        id: &str,
        event: &str,
        action: &str,
        status: Status,
        text: &str,
        at: DateTime<Utc>,
        timeout: Option<u32>,
    ) -> Self {
        Self {
            id: id.to_string(),
            event: event.to_string(),
            change_type: ChangeType::Action,
            severity: None,
            status: Some(status),
            value: Some(action.to_string()),
            text: Some(text.to_string()),
            update_time: at,
            timeout,
        }
    }
}

/// The durable current state of one logical problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub id: String,
    pub environment: String,
    pub resource: String,
    pub event: String,
    pub severity: Severity,
    pub previous_severity: Severity,
    pub trend_indication: TrendIndication,
    pub status: Status,
    /// Status held immediately before the last status change. Recoverable
    /// from the history log if absent.
    pub previous_status: Option<Status>,
    pub correlate: Vec<String>,
    pub service: Vec<String>,
    pub group: Option<String>,
    pub value: String,
    pub text: String,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, Value>,
    pub origin: Option<String>,
    /// Exact duplicates since the current identity appeared.
    pub duplicate_count: u64,
    /// True when the last write was an exact duplicate.
    pub repeat: bool,
    /// Seconds until auto-expiry; zero means never.
    pub timeout: u32,
    /// First-seen time of the current event identity.
    pub create_time: DateTime<Utc>,
    /// When this problem record was first created.
    pub receive_time: DateTime<Utc>,
    pub last_receive_id: String,
    pub last_receive_time: DateTime<Utc>,
    pub raw_data: Option<String>,
    pub customer: Option<String>,
    /// Newest appended last; bounded FIFO, oldest evicted first.
    pub history: Vec<HistoryEntry>,
}

impl ProblemRecord {
    /// Build the initial record for a brand-new problem. Severity, status,
    /// trend and history are finalized by the create branch.
    pub fn from_alert(alert: &Alert, config: &EngineConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: alert.id.clone(),
            environment: alert.environment.clone(),
            resource: alert.resource.clone(),
            event: alert.event.clone(),
            severity: alert.severity,
            previous_severity: config.default_previous_severity,
            trend_indication: TrendIndication::NoChange,
            status: config.default_status,
            previous_status: None,
            correlate: alert.correlate.clone(),
            service: alert.service.clone(),
            group: alert.group.clone(),
            value: alert.value.clone(),
            text: alert.text.clone(),
            tags: alert.tags.clone(),
            attributes: alert.attributes.clone(),
            origin: alert.origin.clone(),
            duplicate_count: 0,
            repeat: false,
            timeout: alert.timeout.unwrap_or(config.default_timeout_secs),
            create_time: alert.create_time,
            receive_time: now,
            last_receive_id: alert.id.clone(),
            last_receive_time: now,
            raw_data: alert.raw_data.clone(),
            customer: alert.customer.clone(),
            history: Vec::new(),
        }
    }

    pub fn match_key(&self) -> MatchKey {
        MatchKey {
            environment: self.environment.clone(),
            resource: self.resource.clone(),
            event: self.event.clone(),
            severity: self.severity,
            customer: self.customer.clone(),
        }
    }

    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey {
            environment: self.environment.clone(),
            resource: self.resource.clone(),
            customer: self.customer.clone(),
        }
    }

    pub fn short_id(&self) -> &str {
        let end = self.id.len().min(8);
        &self.id[..end]
    }

    /// Whether `event` names the same logical problem as this record.
    /// The record's own event is implicitly part of its correlate set.
    pub fn correlates_with(&self, event: &str) -> bool {
        self.event == event || self.correlate.iter().any(|e| e == event)
    }

    /// Append a history entry, evicting the oldest entries beyond `limit`.
    /// Eviction never reorders the surviving entries.
    pub fn push_history(&mut self, entry: HistoryEntry, limit: usize) {
        self.history.push(entry);
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }
}
