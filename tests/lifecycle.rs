//! End-to-end lifecycle tests against the in-memory reference store.

use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};

use klaxon_core::{
    Action, Alert, Blackout, Engine, EngineConfig, EngineError, IngestOutcome, MemoryStore,
    Severity, Status, Store,
};

fn engine_with_store() -> (Engine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Engine::new(store.clone(), EngineConfig::default()), store)
}

#[test]
fn new_then_duplicate_then_correlate() {
    let (engine, _) = engine_with_store();

    let first = Alert::new("production", "web1", "HighCPU", Severity::Major);
    let (record, outcome) = engine.ingest(first).unwrap();
    assert_eq!(outcome, IngestOutcome::Created);
    assert_eq!(record.status, Status::Open);
    assert_eq!(record.duplicate_count, 0);

    let second = Alert::new("production", "web1", "HighCPU", Severity::Major);
    let (record, outcome) = engine.ingest(second).unwrap();
    assert_eq!(outcome, IngestOutcome::Duplicate);
    assert_eq!(record.duplicate_count, 1);
    assert!(record.repeat);

    let mut third = Alert::new("production", "web1", "CPUNormal", Severity::Normal);
    third.correlate = vec!["HighCPU".to_string()];
    let (record, outcome) = engine.ingest(third).unwrap();
    assert_eq!(outcome, IngestOutcome::Correlated);
    assert_eq!(record.event, "CPUNormal");
    assert_eq!(record.severity, Severity::Normal);
    assert_eq!(record.status, Status::Closed);
    assert_eq!(record.duplicate_count, 0);
    assert!(!record.repeat);
    assert_eq!(record.previous_severity, Severity::Major);
}

#[test]
fn shelve_then_unshelve_restores_previous_status() {
    let (engine, _) = engine_with_store();
    let (record, _) = engine
        .ingest(Alert::new("production", "web1", "HighCPU", Severity::Major))
        .unwrap();

    let shelved = engine
        .apply_action(&record.id, Action::Shelve, Some("maintenance"), None)
        .unwrap();
    assert_eq!(shelved.status, Status::Shelved);

    let err = engine
        .apply_action(&record.id, Action::Ack, None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAction(_)));

    let unshelved = engine
        .apply_action(&record.id, Action::Unshelve, None, None)
        .unwrap();
    assert_eq!(unshelved.status, Status::Open);
}

#[test]
fn blackout_suppresses_then_reverts_after_window() {
    let (engine, store) = engine_with_store();

    let window = Blackout::new(
        "production",
        Utc::now() - Duration::minutes(5),
        Utc::now() + Duration::hours(1),
    );
    let window_id = window.id.clone();
    store.add_blackout(window);

    let (record, _) = engine
        .ingest(Alert::new("production", "web1", "HighCPU", Severity::Critical))
        .unwrap();
    assert_eq!(record.status, Status::Blackout);

    // window over: the next event for the same key reverts to what the
    // state machine computes absent suppression
    store.remove_blackout(&window_id);
    let (record, outcome) = engine
        .ingest(Alert::new("production", "web1", "HighCPU", Severity::Critical))
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Duplicate);
    assert_eq!(record.status, Status::Open);
}

#[test]
fn auto_close_from_any_status() {
    let (engine, _) = engine_with_store();
    let (record, _) = engine
        .ingest(Alert::new("production", "web1", "HighCPU", Severity::Major))
        .unwrap();
    engine
        .apply_action(&record.id, Action::Ack, None, None)
        .unwrap();

    let clearing = Alert::new("production", "web1", "HighCPU", Severity::Normal);
    let (record, outcome) = engine.ingest(clearing).unwrap();
    assert_eq!(outcome, IngestOutcome::Correlated);
    assert_eq!(record.status, Status::Closed);
    assert_eq!(record.severity, Severity::Normal);
}

#[test]
fn severity_flap_reopens_acknowledged_alert() {
    let (engine, _) = engine_with_store();
    let (record, _) = engine
        .ingest(Alert::new("production", "web1", "HighCPU", Severity::Warning))
        .unwrap();
    engine
        .apply_action(&record.id, Action::Ack, None, None)
        .unwrap();

    // same event, worse severity: correlated write that auto-reopens
    let escalated = Alert::new("production", "web1", "HighCPU", Severity::Critical);
    let (record, outcome) = engine.ingest(escalated).unwrap();
    assert_eq!(outcome, IngestOutcome::Correlated);
    assert_eq!(record.status, Status::Open);
    assert_eq!(record.severity, Severity::Critical);
    assert_eq!(record.previous_severity, Severity::Warning);
}

#[test]
fn history_is_bounded_fifo() {
    let store = Arc::new(MemoryStore::new());
    let config = EngineConfig {
        history_limit: 5,
        ..EngineConfig::default()
    };
    let engine = Engine::new(store, config);

    // alternate severities on one event so every write is a correlation
    // and appends at least a severity entry
    for n in 0..12 {
        let severity = if n % 2 == 0 {
            Severity::Major
        } else {
            Severity::Minor
        };
        engine
            .ingest(Alert::new("production", "web1", "HighCPU", severity))
            .unwrap();
    }

    let (record, _) = engine
        .ingest(Alert::new("production", "web1", "HighCPU", Severity::Critical))
        .unwrap();
    assert_eq!(record.history.len(), 5);
    // relative order of the survivors is preserved
    for pair in record.history.windows(2) {
        assert!(pair[0].update_time <= pair[1].update_time);
    }
}

#[test]
fn concurrent_duplicates_keep_one_record() {
    let (engine, store) = engine_with_store();
    let engine = Arc::new(engine);

    const WRITERS: usize = 8;
    thread::scope(|scope| {
        for _ in 0..WRITERS {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                let alert = Alert::new("production", "web1", "HighCPU", Severity::Major);
                engine.ingest(alert).unwrap();
            });
        }
    });

    assert_eq!(store.record_count(), 1);
    let key = Alert::new("production", "web1", "HighCPU", Severity::Major).match_key();
    let record = store.find_duplicate(&key).unwrap().unwrap();
    assert_eq!(record.duplicate_count, (WRITERS - 1) as u64);
}

#[test]
fn expiry_then_reopen_on_new_event() {
    let (engine, _store) = engine_with_store();
    let (record, _) = engine
        .ingest(Alert::new("production", "web1", "HighCPU", Severity::Major))
        .unwrap();

    let expired = engine
        .apply_action(&record.id, Action::Expired, None, None)
        .unwrap();
    assert_eq!(expired.status, Status::Expired);

    // a new non-normal event for the same key reopens it
    let (record, outcome) = engine
        .ingest(Alert::new("production", "web1", "HighCPU", Severity::Major))
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Duplicate);
    // status untouched on plain dedup; the reopen needs a severity change
    assert_eq!(record.status, Status::Expired);

    let (record, outcome) = engine
        .ingest(Alert::new("production", "web1", "HighCPU", Severity::Critical))
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Correlated);
    assert_eq!(record.status, Status::Open);
}
