//! Explicit operator actions.
//!
//! Actions bypass the matcher entirely: they locate a record by id
//! (supporting short-id prefix lookup) and run the state machine with the
//! requested action. An invalid action surfaces without mutating the
//! record.

use chrono::Utc;

use crate::error::{EngineError, Result};
use crate::model::{Action, HistoryEntry, ProblemRecord};
use crate::state::TransitionInput;
use crate::storage::{IdMatch, Mutation, RecordSelector};

use super::context::ReceiveContext;
use super::ingestion::Engine;

impl Engine {
    /// Apply an operator action to the record identified by `id` (full id
    /// or unique short-id prefix). Returns the updated record.
    pub fn apply_action(
        &self,
        id: &str,
        action: Action,
        text: Option<&str>,
        timeout_override: Option<u32>,
    ) -> Result<ProblemRecord> {
        let ctx = ReceiveContext::new(id).log_context();
        let record = self.resolve_id(id)?;

        let next = self.machine.transition(TransitionInput {
            current_severity: record.severity,
            previous_severity: record.previous_severity,
            current_status: record.status,
            previous_status: record
                .previous_status
                .unwrap_or(self.config.default_status),
            requested_status: None,
            action: Some(action.clone()),
        })?;

        let now = Utc::now();
        let reason = text.unwrap_or("operator action");

        let mut mutation = Mutation {
            severity: Some(next.severity),
            timeout: timeout_override,
            history_limit: Some(self.config.history_limit),
            ..Mutation::default()
        };
        mutation.append_history.push(HistoryEntry::action(
            &record.id,
            &record.event,
            action.as_str(),
            next.status,
            reason,
            now,
            timeout_override,
        ));
        if next.status != record.status {
            mutation.status = Some(next.status);
            mutation.previous_status = Some(record.status);
            mutation.append_history.push(HistoryEntry::status(
                &record.id,
                &record.event,
                next.status,
                reason,
                now,
            ));
        }

        match self
            .store
            .atomic_update(&RecordSelector::ById(record.id.clone()), &mutation)?
        {
            Some(updated) => {
                log::info!(
                    "{} ACTION_APPLIED action={} status={} previous_status={}",
                    ctx,
                    action,
                    updated.status,
                    record.status
                );
                Ok(updated)
            }
            // the record vanished between lookup and update
            None => Err(EngineError::NotFound(id.to_string())),
        }
    }

    /// Explicit operator delete, the only non-retention deletion path.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let record = self.resolve_id(id)?;
        let deleted = self.store.delete(&record.id)?;
        if deleted {
            log::info!(
                "ALERT_DELETED record={} resource={} event={}",
                record.short_id(),
                record.resource,
                record.event
            );
        }
        Ok(deleted)
    }

    fn resolve_id(&self, id: &str) -> Result<ProblemRecord> {
        if let Some(record) = self.store.find_by_id(id)? {
            return Ok(record);
        }
        match self.store.find_by_id_prefix(id)? {
            IdMatch::One(record) => Ok(record),
            IdMatch::None => Err(EngineError::NotFound(id.to_string())),
            // ambiguity is never resolved first-match-wins
            IdMatch::Many => Err(EngineError::NotFound(format!(
                "short id '{}' is ambiguous",
                id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{Alert, Severity, Status};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn engine() -> Engine {
        Engine::new(Arc::new(MemoryStore::new()), EngineConfig::default())
    }

    fn ingest_one(engine: &Engine) -> ProblemRecord {
        let alert = Alert::new("production", "web01", "HighCPU", Severity::Major);
        engine.ingest(alert).unwrap().0
    }

    #[test]
    fn test_ack_then_unack() {
        let engine = engine();
        let record = ingest_one(&engine);

        let acked = engine
            .apply_action(&record.id, Action::Ack, Some("looking into it"), None)
            .unwrap();
        assert_eq!(acked.status, Status::Ack);
        assert_eq!(acked.previous_status, Some(Status::Open));

        let unacked = engine
            .apply_action(&record.id, Action::Unack, None, None)
            .unwrap();
        assert_eq!(unacked.status, Status::Open);
    }

    #[test]
    fn test_shelve_ack_is_invalid() {
        let engine = engine();
        let record = ingest_one(&engine);

        engine
            .apply_action(&record.id, Action::Shelve, None, None)
            .unwrap();
        let err = engine
            .apply_action(&record.id, Action::Ack, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAction(_)));

        // record untouched by the failed action
        let unshelved = engine
            .apply_action(&record.id, Action::Unshelve, None, None)
            .unwrap();
        assert_eq!(unshelved.status, Status::Open);
    }

    #[test]
    fn test_close_forces_normal_severity() {
        let engine = engine();
        let record = ingest_one(&engine);

        let closed = engine
            .apply_action(&record.id, Action::Close, None, None)
            .unwrap();
        assert_eq!(closed.status, Status::Closed);
        assert_eq!(closed.severity, Severity::Normal);
    }

    #[test]
    fn test_short_id_lookup() {
        let engine = engine();
        let record = ingest_one(&engine);

        let acked = engine
            .apply_action(record.short_id(), Action::Ack, None, None)
            .unwrap();
        assert_eq!(acked.status, Status::Ack);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let engine = engine();
        ingest_one(&engine);
        let err = engine
            .apply_action("ffffffff", Action::Ack, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_action_appends_history() {
        let engine = engine();
        let record = ingest_one(&engine);

        let acked = engine
            .apply_action(&record.id, Action::Ack, Some("on it"), None)
            .unwrap();
        // one action entry plus one status entry on top of the create entry
        assert_eq!(acked.history.len(), record.history.len() + 2);
        let action_entry = acked
            .history
            .iter()
            .rev()
            .find(|h| h.change_type == crate::model::ChangeType::Action)
            .unwrap();
        assert_eq!(action_entry.value.as_deref(), Some("ack"));
        assert_eq!(action_entry.status, Some(Status::Ack));
    }

    #[test]
    fn test_timeout_override_applies() {
        let engine = engine();
        let record = ingest_one(&engine);

        let shelved = engine
            .apply_action(&record.id, Action::Shelve, None, Some(7200))
            .unwrap();
        assert_eq!(shelved.timeout, 7200);
    }

    #[test]
    fn test_external_action_keeps_status() {
        let engine = engine();
        let record = ingest_one(&engine);

        let updated = engine
            .apply_action(
                &record.id,
                Action::External("escalate".to_string()),
                None,
                None,
            )
            .unwrap();
        assert_eq!(updated.status, Status::Open);
    }

    #[test]
    fn test_delete() {
        let engine = engine();
        let record = ingest_one(&engine);
        assert!(engine.delete(&record.id).unwrap());
        assert!(matches!(
            engine.delete(&record.id),
            Err(EngineError::NotFound(_))
        ));
    }
}
