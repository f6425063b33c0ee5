//! In-memory reference backend.
//!
//! Every contract call takes one write (or read) lock over the record
//! map, which is exactly the linearizable per-key semantics the contract
//! demands of real backends. SQL and document-store implementations get
//! the same guarantees from a unique index plus conditional
//! UPDATE..RETURNING / find-and-modify.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::model::{ChangeType, CorrelationKey, MatchKey, ProblemRecord, Severity, Status};
use crate::storage::contract::{
    CreateOutcome, IdMatch, Mutation, RecordSelector, Store, StoreResult,
};
use crate::suppression::{Blackout, SuppressionQuery};

/// Reference store used by tests, benches and embedded deployments.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ProblemRecord>>,
    blackouts: RwLock<Vec<Blackout>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a suppression window.
    pub fn add_blackout(&self, blackout: Blackout) {
        log::info!(
            "BLACKOUT_ADDED id={} environment={} priority={}",
            blackout.id,
            blackout.environment,
            blackout.priority()
        );
        self.blackouts.write().push(blackout);
    }

    pub fn remove_blackout(&self, id: &str) -> bool {
        let mut blackouts = self.blackouts.write();
        let before = blackouts.len();
        blackouts.retain(|b| b.id != id);
        blackouts.len() != before
    }

    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    fn is_duplicate(record: &ProblemRecord, key: &MatchKey) -> bool {
        record.environment == key.environment
            && record.resource == key.resource
            && record.event == key.event
            && record.severity == key.severity
            && record.customer == key.customer
    }

    fn is_correlated(
        record: &ProblemRecord,
        key: &CorrelationKey,
        event: &str,
        severity: Severity,
        correlate: &[String],
    ) -> bool {
        if record.environment != key.environment
            || record.resource != key.resource
            || record.customer != key.customer
        {
            return false;
        }
        if record.event == event {
            record.severity != severity
        } else {
            // either side's correlate list may declare the relationship
            record.correlate.iter().any(|e| e == event)
                || correlate.iter().any(|e| *e == record.event)
        }
    }

    fn select<'a>(
        records: &'a mut HashMap<String, ProblemRecord>,
        selector: &RecordSelector,
    ) -> Option<&'a mut ProblemRecord> {
        match selector {
            RecordSelector::Duplicate(key) => records
                .values_mut()
                .find(|r| Self::is_duplicate(r, key)),
            RecordSelector::Correlated {
                key,
                event,
                severity,
                correlate,
            } => records
                .values_mut()
                .find(|r| Self::is_correlated(r, key, event, *severity, correlate)),
            RecordSelector::ById(id) => records.get_mut(id),
        }
    }
}

impl Store for MemoryStore {
    fn find_duplicate(&self, key: &MatchKey) -> StoreResult<Option<ProblemRecord>> {
        let records = self.records.read();
        Ok(records
            .values()
            .find(|r| Self::is_duplicate(r, key))
            .cloned())
    }

    fn find_correlated(
        &self,
        key: &CorrelationKey,
        event: &str,
        severity: Severity,
        correlate: &[String],
    ) -> StoreResult<Option<ProblemRecord>> {
        let records = self.records.read();
        Ok(records
            .values()
            .find(|r| Self::is_correlated(r, key, event, severity, correlate))
            .cloned())
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<ProblemRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn find_by_id_prefix(&self, prefix: &str) -> StoreResult<IdMatch> {
        let records = self.records.read();
        let mut matches = records.values().filter(|r| r.id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (None, _) => Ok(IdMatch::None),
            (Some(record), None) => Ok(IdMatch::One(record.clone())),
            (Some(_), Some(_)) => Ok(IdMatch::Many),
        }
    }

    fn atomic_create(&self, record: ProblemRecord) -> StoreResult<CreateOutcome> {
        let mut records = self.records.write();
        // uniqueness constraint on the matching key
        let key = record.match_key();
        if records.values().any(|r| Self::is_duplicate(r, &key)) {
            return Ok(CreateOutcome::KeyConflict);
        }
        records.insert(record.id.clone(), record.clone());
        Ok(CreateOutcome::Created(record))
    }

    fn atomic_update(
        &self,
        selector: &RecordSelector,
        mutation: &Mutation,
    ) -> StoreResult<Option<ProblemRecord>> {
        let mut records = self.records.write();
        match Self::select(&mut records, selector) {
            Some(record) => {
                mutation.apply_to(record);
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    fn find_active_suppression(&self, query: &SuppressionQuery<'_>) -> StoreResult<bool> {
        let blackouts = self.blackouts.read();
        let mut candidates: Vec<&Blackout> = blackouts.iter().collect();
        candidates.sort_by(|a, b| b.priority().cmp(&a.priority()));
        for blackout in candidates {
            if blackout.matches(query) {
                log::debug!(
                    "BLACKOUT_MATCHED id={} priority={} environment={}",
                    blackout.id,
                    blackout.priority(),
                    blackout.environment
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<ProblemRecord>> {
        let records = self.records.read();
        Ok(records
            .values()
            .filter(|r| {
                r.status != Status::Expired
                    && r.status != Status::Shelved
                    && r.timeout != 0
                    && r.last_receive_time + Duration::seconds(i64::from(r.timeout)) <= now
            })
            .cloned()
            .collect())
    }

    fn sweep_shelve_timeouts(&self, now: DateTime<Utc>) -> StoreResult<Vec<ProblemRecord>> {
        let records = self.records.read();
        Ok(records
            .values()
            .filter(|r| {
                if r.status != Status::Shelved || r.timeout == 0 {
                    return false;
                }
                // deadline runs from the most recent shelving action
                r.history
                    .iter()
                    .rev()
                    .find(|h| {
                        h.change_type == ChangeType::Action && h.status == Some(Status::Shelved)
                    })
                    .map(|h| h.update_time + Duration::seconds(i64::from(r.timeout)) <= now)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.records.write().remove(id).is_some())
    }

    fn delete_resolved_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<String>> {
        let mut records = self.records.write();
        let ids: Vec<String> = records
            .values()
            .filter(|r| {
                (r.status == Status::Closed || r.status == Status::Expired)
                    && r.last_receive_time < cutoff
            })
            .map(|r| r.id.clone())
            .collect();
        for id in &ids {
            records.remove(id);
        }
        Ok(ids)
    }

    fn delete_informational_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<String>> {
        let mut records = self.records.write();
        let ids: Vec<String> = records
            .values()
            .filter(|r| r.severity == Severity::Informational && r.last_receive_time < cutoff)
            .map(|r| r.id.clone())
            .collect();
        for id in &ids {
            records.remove(id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{Alert, HistoryEntry};

    fn store_with(alert: &Alert) -> (MemoryStore, ProblemRecord) {
        let store = MemoryStore::new();
        let record = ProblemRecord::from_alert(alert, &EngineConfig::default(), Utc::now());
        match store.atomic_create(record).unwrap() {
            CreateOutcome::Created(r) => (store, r),
            CreateOutcome::KeyConflict => panic!("unexpected conflict"),
        }
    }

    #[test]
    fn test_create_conflict_on_same_key() {
        let alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        let (store, _) = store_with(&alert);

        let again = ProblemRecord::from_alert(
            &Alert::new("production", "web01", "HighCPU", Severity::Major),
            &EngineConfig::default(),
            Utc::now(),
        );
        assert!(matches!(
            store.atomic_create(again).unwrap(),
            CreateOutcome::KeyConflict
        ));
    }

    #[test]
    fn test_find_correlated_by_correlate_set() {
        let mut alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        alert.correlate = vec!["CPUNormal".to_string()];
        let (store, record) = store_with(&alert);

        let hit = store
            .find_correlated(&record.correlation_key(), "CPUNormal", Severity::Normal, &[])
            .unwrap();
        assert!(hit.is_some());

        let miss = store
            .find_correlated(&record.correlation_key(), "DiskFull", Severity::Normal, &[])
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_find_correlated_same_event_different_severity() {
        let alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        let (store, record) = store_with(&alert);

        let hit = store
            .find_correlated(&record.correlation_key(), "HighCPU", Severity::Critical, &[])
            .unwrap();
        assert!(hit.is_some());

        // same severity is a duplicate, not a correlation
        let miss = store
            .find_correlated(&record.correlation_key(), "HighCPU", Severity::Major, &[])
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_correlation_is_tenant_scoped() {
        let mut alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        alert.customer = Some("acme".to_string());
        let (store, record) = store_with(&alert);

        let mut other_tenant = record.correlation_key();
        other_tenant.customer = Some("globex".to_string());
        let miss = store
            .find_correlated(&other_tenant, "HighCPU", Severity::Critical, &[])
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_atomic_update_returns_none_when_selector_misses() {
        let alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        let (store, _) = store_with(&alert);

        let mut key = alert.match_key();
        key.severity = Severity::Critical;
        let result = store
            .atomic_update(&RecordSelector::Duplicate(key), &Mutation::default())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_prefix_lookup() {
        let alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        let (store, record) = store_with(&alert);

        assert!(matches!(
            store.find_by_id_prefix(record.short_id()).unwrap(),
            IdMatch::One(_)
        ));
        assert!(matches!(
            store.find_by_id_prefix("zzzzzzzz").unwrap(),
            IdMatch::None
        ));
        // every uuid starts with the empty prefix
        let other = Alert::new("production", "db01", "DiskFull", Severity::Minor);
        let r = ProblemRecord::from_alert(&other, &EngineConfig::default(), Utc::now());
        store.atomic_create(r).unwrap();
        assert!(matches!(store.find_by_id_prefix("").unwrap(), IdMatch::Many));
    }

    #[test]
    fn test_sweep_expired_skips_shelved_and_zero_timeout() {
        let store = MemoryStore::new();
        let config = EngineConfig::default();
        let old = Utc::now() - Duration::hours(48);

        let mut stale = ProblemRecord::from_alert(
            &Alert::new("production", "web01", "HighCPU", Severity::Major),
            &config,
            old,
        );
        stale.last_receive_time = old;
        store.atomic_create(stale).unwrap();

        let mut shelved = ProblemRecord::from_alert(
            &Alert::new("production", "web02", "HighCPU", Severity::Major),
            &config,
            old,
        );
        shelved.last_receive_time = old;
        shelved.status = Status::Shelved;
        store.atomic_create(shelved).unwrap();

        let mut no_timeout = ProblemRecord::from_alert(
            &Alert::new("production", "web03", "HighCPU", Severity::Major),
            &config,
            old,
        );
        no_timeout.last_receive_time = old;
        no_timeout.timeout = 0;
        store.atomic_create(no_timeout).unwrap();

        let due = store.sweep_expired(Utc::now()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].resource, "web01");
    }

    #[test]
    fn test_sweep_shelve_timeouts_reads_latest_action() {
        let store = MemoryStore::new();
        let config = EngineConfig::default();
        let now = Utc::now();

        let mut record = ProblemRecord::from_alert(
            &Alert::new("production", "web01", "HighCPU", Severity::Major),
            &config,
            now,
        );
        record.status = Status::Shelved;
        record.timeout = 3600;
        record.history.push(HistoryEntry::action(
            &record.id.clone(),
            "HighCPU",
            "shelve",
            Status::Shelved,
            "quiet period",
            now - Duration::hours(2),
            None,
        ));
        store.atomic_create(record).unwrap();

        let due = store.sweep_shelve_timeouts(now).unwrap();
        assert_eq!(due.len(), 1);

        // a fresh shelve action pushes the deadline out
        let not_due = store.sweep_shelve_timeouts(now - Duration::hours(2)).unwrap();
        assert!(not_due.is_empty());
    }

    #[test]
    fn test_retention_deletes() {
        let store = MemoryStore::new();
        let config = EngineConfig::default();
        let old = Utc::now() - Duration::hours(48);

        let mut closed = ProblemRecord::from_alert(
            &Alert::new("production", "web01", "HighCPU", Severity::Major),
            &config,
            old,
        );
        closed.status = Status::Closed;
        closed.last_receive_time = old;
        store.atomic_create(closed).unwrap();

        let mut info = ProblemRecord::from_alert(
            &Alert::new("production", "web02", "Deploy", Severity::Informational),
            &config,
            old,
        );
        info.last_receive_time = old;
        store.atomic_create(info).unwrap();

        let resolved = store
            .delete_resolved_before(Utc::now() - Duration::hours(24))
            .unwrap();
        assert_eq!(resolved.len(), 1);
        let informational = store
            .delete_informational_before(Utc::now() - Duration::hours(24))
            .unwrap();
        assert_eq!(informational.len(), 1);
        assert_eq!(store.record_count(), 0);
    }
}
