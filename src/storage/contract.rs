//! The persistence contract.
//!
//! Every backend must provide atomic compare-and-swap-like upsert
//! semantics keyed on the matching predicate: `atomic_update` is one
//! conditional read-and-update returning the post-update record, and
//! `atomic_create` surfaces uniqueness-constraint conflicts instead of
//! clobbering a concurrent writer's record.
//!
//! A `Mutation` is a SET-clause description rather than a closure so SQL
//! backends can compile it to a single conditional UPDATE..RETURNING and
//! document stores to a single find-and-modify.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::model::{
    CorrelationKey, HistoryEntry, MatchKey, ProblemRecord, Severity, Status, TrendIndication,
};
use crate::suppression::SuppressionQuery;

/// Backend failure. A timeout or unreachable store is transient and must
/// never be reported as "no match found".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of an atomic create.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(ProblemRecord),
    /// Another writer created a record for the same matching key first.
    KeyConflict,
}

/// Outcome of a short-id prefix lookup.
#[derive(Debug)]
pub enum IdMatch {
    None,
    One(ProblemRecord),
    /// Ambiguous prefix; callers must treat this as not-found, never
    /// first-match-wins.
    Many,
}

/// The predicate an atomic update is conditioned on. The backend
/// re-evaluates it under its own atomicity primitive, so a record that
/// changed out from under the caller's classification matches nothing.
#[derive(Debug, Clone)]
pub enum RecordSelector {
    Duplicate(MatchKey),
    Correlated {
        key: CorrelationKey,
        event: String,
        severity: Severity,
        /// The incoming alert's correlate list; a record whose event is
        /// named here is the same logical problem.
        correlate: Vec<String>,
    },
    ById(String),
}

/// A storage-agnostic description of one conditional update.
#[derive(Debug, Clone, Default)]
pub struct Mutation {
    pub event: Option<String>,
    pub severity: Option<Severity>,
    pub previous_severity: Option<Severity>,
    pub trend_indication: Option<TrendIndication>,
    pub status: Option<Status>,
    pub previous_status: Option<Status>,
    pub value: Option<String>,
    pub text: Option<String>,
    pub timeout: Option<u32>,
    pub raw_data: Option<String>,
    pub repeat: Option<bool>,
    pub reset_duplicate_count: bool,
    pub increment_duplicate_count: bool,
    pub create_time: Option<DateTime<Utc>>,
    pub last_receive_id: Option<String>,
    pub last_receive_time: Option<DateTime<Utc>>,
    /// Non-empty incoming correlate lists replace the stored set.
    pub replace_correlate: Option<Vec<String>>,
    /// Union-merged into the stored tags, preserving order, no duplicates.
    pub merge_tags: Vec<String>,
    /// Last-write-wins per key; a `Null` value deletes the key.
    pub merge_attributes: BTreeMap<String, Value>,
    pub append_history: Vec<HistoryEntry>,
    /// History cap applied after appending; `None` leaves it unbounded.
    pub history_limit: Option<usize>,
}

impl Mutation {
    /// Apply this mutation to a record. Backends call this under their
    /// atomicity primitive.
    pub fn apply_to(&self, record: &mut ProblemRecord) {
        if let Some(event) = &self.event {
            record.event = event.clone();
        }
        if let Some(severity) = self.severity {
            record.severity = severity;
        }
        if let Some(previous_severity) = self.previous_severity {
            record.previous_severity = previous_severity;
        }
        if let Some(trend_indication) = self.trend_indication {
            record.trend_indication = trend_indication;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(previous_status) = self.previous_status {
            record.previous_status = Some(previous_status);
        }
        if let Some(value) = &self.value {
            record.value = value.clone();
        }
        if let Some(text) = &self.text {
            record.text = text.clone();
        }
        if let Some(timeout) = self.timeout {
            record.timeout = timeout;
        }
        if let Some(raw_data) = &self.raw_data {
            record.raw_data = Some(raw_data.clone());
        }
        if let Some(repeat) = self.repeat {
            record.repeat = repeat;
        }
        if self.reset_duplicate_count {
            record.duplicate_count = 0;
        }
        if self.increment_duplicate_count {
            record.duplicate_count += 1;
        }
        if let Some(create_time) = self.create_time {
            record.create_time = create_time;
        }
        if let Some(last_receive_id) = &self.last_receive_id {
            record.last_receive_id = last_receive_id.clone();
        }
        if let Some(last_receive_time) = self.last_receive_time {
            record.last_receive_time = last_receive_time;
        }
        if let Some(correlate) = &self.replace_correlate {
            record.correlate = correlate.clone();
        }
        for tag in &self.merge_tags {
            if !record.tags.contains(tag) {
                record.tags.push(tag.clone());
            }
        }
        for (key, value) in &self.merge_attributes {
            if value.is_null() {
                record.attributes.remove(key);
            } else {
                record.attributes.insert(key.clone(), value.clone());
            }
        }
        for entry in &self.append_history {
            record.history.push(entry.clone());
        }
        if let Some(limit) = self.history_limit {
            if record.history.len() > limit {
                let excess = record.history.len() - limit;
                record.history.drain(..excess);
            }
        }
    }
}

/// The persistence contract.
///
/// Per matching key, writes must be linearizable; the backend's atomic
/// find-and-update primitive (or unique constraint plus retry) is the
/// sole mechanism providing this. The pipeline holds no in-process lock.
pub trait Store: Send + Sync {
    fn find_duplicate(&self, key: &MatchKey) -> StoreResult<Option<ProblemRecord>>;

    /// A record on the same `(environment, resource, customer)` where
    /// either the event matches with a different severity, or the event
    /// names differ but one side's correlate list admits the other
    /// (incoming event in the record's set, or record event in the
    /// incoming `correlate` list).
    fn find_correlated(
        &self,
        key: &CorrelationKey,
        event: &str,
        severity: Severity,
        correlate: &[String],
    ) -> StoreResult<Option<ProblemRecord>>;

    fn find_by_id(&self, id: &str) -> StoreResult<Option<ProblemRecord>>;

    fn find_by_id_prefix(&self, prefix: &str) -> StoreResult<IdMatch>;

    /// Insert a brand-new record, failing with `KeyConflict` when a
    /// record for the same matching key already exists.
    fn atomic_create(&self, record: ProblemRecord) -> StoreResult<CreateOutcome>;

    /// One conditional read-and-update. Returns the post-update record,
    /// or `None` when the selector matched nothing (the caller must then
    /// reclassify, never silently no-op).
    fn atomic_update(
        &self,
        selector: &RecordSelector,
        mutation: &Mutation,
    ) -> StoreResult<Option<ProblemRecord>>;

    /// Whether any active blackout window suppresses the queried alert.
    fn find_active_suppression(&self, query: &SuppressionQuery<'_>) -> StoreResult<bool>;

    /// Records due for expiry: status outside expired/shelved, non-zero
    /// timeout, and `last_receive_time + timeout` in the past.
    fn sweep_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<ProblemRecord>>;

    /// Shelved records whose most recent shelving action is older than
    /// the record's timeout.
    fn sweep_shelve_timeouts(&self, now: DateTime<Utc>) -> StoreResult<Vec<ProblemRecord>>;

    fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Delete closed/expired records last written before `cutoff`.
    fn delete_resolved_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<String>>;

    /// Delete informational-severity records last written before `cutoff`.
    fn delete_informational_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<String>>;
}
