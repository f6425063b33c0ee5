//! Duplicate / correlated / new classification.
//!
//! A pure predicate over the store's two finder queries; the result
//! selects which pipeline branch runs. The duplicate check is attempted
//! strictly first, correlation only if it misses.

use crate::logging::LogContext;
use crate::model::Alert;
use crate::model::ProblemRecord;
use crate::storage::{Store, StoreResult};

/// How an inbound event relates to the existing records.
#[derive(Debug)]
pub enum Classification {
    /// Identical matching key; increments the duplicate count.
    Duplicate(ProblemRecord),
    /// Same problem under a different event label or severity.
    Correlated(ProblemRecord),
    /// No match; a new problem record is created.
    New,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Duplicate(_) => "duplicate",
            Classification::Correlated(_) => "correlated",
            Classification::New => "new",
        }
    }
}

/// Classify an alert against the store.
pub fn classify(store: &dyn Store, alert: &Alert, ctx: &LogContext) -> StoreResult<Classification> {
    if let Some(record) = store.find_duplicate(&alert.match_key())? {
        log::debug!(
            "{} CLASSIFY_DUPLICATE record={} duplicate_count={}",
            ctx,
            record.short_id(),
            record.duplicate_count
        );
        return Ok(Classification::Duplicate(record));
    }

    if let Some(record) = store.find_correlated(
        &alert.correlation_key(),
        &alert.event,
        alert.severity,
        &alert.correlate,
    )? {
        log::debug!(
            "{} CLASSIFY_CORRELATED record={} record_event={} incoming_event={}",
            ctx,
            record.short_id(),
            record.event,
            alert.event
        );
        return Ok(Classification::Correlated(record));
    }

    log::debug!("{} CLASSIFY_NEW event={}", ctx, alert.event);
    Ok(Classification::New)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{ProblemRecord, Severity};
    use crate::storage::{CreateOutcome, MemoryStore};
    use chrono::Utc;

    fn ctx() -> LogContext {
        LogContext::new("test")
    }

    fn seed(store: &MemoryStore, alert: &Alert) -> ProblemRecord {
        let record = ProblemRecord::from_alert(alert, &EngineConfig::default(), Utc::now());
        match store.atomic_create(record).unwrap() {
            CreateOutcome::Created(r) => r,
            CreateOutcome::KeyConflict => panic!("unexpected conflict"),
        }
    }

    #[test]
    fn test_classify_new_on_empty_store() {
        let store = MemoryStore::new();
        let alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        assert!(matches!(
            classify(&store, &alert, &ctx()).unwrap(),
            Classification::New
        ));
    }

    #[test]
    fn test_duplicate_wins_over_correlation() {
        let store = MemoryStore::new();
        let mut alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        alert.correlate = vec!["HighCPU".to_string()];
        seed(&store, &alert);

        // identical key: duplicate, even though the correlate set would
        // also admit the event name
        let incoming = Alert::new("production", "web01", "HighCPU", Severity::Major);
        assert!(matches!(
            classify(&store, &incoming, &ctx()).unwrap(),
            Classification::Duplicate(_)
        ));
    }

    #[test]
    fn test_correlated_via_correlate_set() {
        let store = MemoryStore::new();
        let mut alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        alert.correlate = vec!["CPUNormal".to_string()];
        seed(&store, &alert);

        let incoming = Alert::new("production", "web01", "CPUNormal", Severity::Normal);
        assert!(matches!(
            classify(&store, &incoming, &ctx()).unwrap(),
            Classification::Correlated(_)
        ));
    }

    #[test]
    fn test_correlated_via_incoming_correlate_list() {
        let store = MemoryStore::new();
        let alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        seed(&store, &alert);

        // the clearing event declares the relationship itself
        let mut incoming = Alert::new("production", "web01", "CPUNormal", Severity::Normal);
        incoming.correlate = vec!["HighCPU".to_string()];
        assert!(matches!(
            classify(&store, &incoming, &ctx()).unwrap(),
            Classification::Correlated(_)
        ));
    }

    #[test]
    fn test_correlated_via_severity_change() {
        let store = MemoryStore::new();
        let alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        seed(&store, &alert);

        let incoming = Alert::new("production", "web01", "HighCPU", Severity::Critical);
        assert!(matches!(
            classify(&store, &incoming, &ctx()).unwrap(),
            Classification::Correlated(_)
        ));
    }

    #[test]
    fn test_different_resource_is_new() {
        let store = MemoryStore::new();
        let alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        seed(&store, &alert);

        let incoming = Alert::new("production", "web02", "HighCPU", Severity::Major);
        assert!(matches!(
            classify(&store, &incoming, &ctx()).unwrap(),
            Classification::New
        ));
    }

    #[test]
    fn test_tenants_never_match() {
        let store = MemoryStore::new();
        let mut alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        alert.customer = Some("acme".to_string());
        seed(&store, &alert);

        let mut incoming = Alert::new("production", "web01", "HighCPU", Severity::Major);
        incoming.customer = Some("globex".to_string());
        assert!(matches!(
            classify(&store, &incoming, &ctx()).unwrap(),
            Classification::New
        ));
    }
}
