//! Main alert ingestion pipeline.
//!
//! Coordinates the full receive workflow:
//! 1. Boundary validation
//! 2. Pre-receive plugin hooks (mutate or reject)
//! 3. Blackout suppression lookup
//! 4. Duplicate/correlated/new classification
//! 5. Alarm state machine
//! 6. One atomic persistence write, retried on lost races
//! 7. Post-receive plugin hooks
//!
//! Each branch is a single atomic store call: either it fully applies or
//! it fully fails, so there is never partial-commit state to roll back.

use std::sync::Arc;

use chrono::Utc;

use crate::config::EngineConfig;
use crate::correlate::{classify, Classification};
use crate::error::{EngineError, Result};
use crate::hooks::{Plugin, PreReceive};
use crate::logging::LogContext;
use crate::model::{
    trend, validate_alert, Alert, HistoryEntry, ProblemRecord, Status,
};
use crate::state::{StateMachine, Transition, TransitionInput};
use crate::storage::{CreateOutcome, Mutation, RecordSelector, Store};
use crate::suppression::SuppressionQuery;

use super::context::ReceiveContext;

/// How an ingested event was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Created,
    Duplicate,
    Correlated,
}

impl IngestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestOutcome::Created => "created",
            IngestOutcome::Duplicate => "duplicate",
            IngestOutcome::Correlated => "correlated",
        }
    }
}

/// The decision-and-transition engine.
///
/// Holds no in-process lock; per-key linearizability comes entirely from
/// the store's atomic primitives, so concurrent engines over the same
/// store are safe.
pub struct Engine {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) config: EngineConfig,
    pub(crate) machine: StateMachine,
    pub(crate) plugins: Vec<Box<dyn Plugin>>,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        let machine = StateMachine::new(&config);
        Self {
            store,
            config,
            machine,
            plugins: Vec::new(),
        }
    }

    /// Register a plugin. Hooks run in registration order.
    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ingest one event: classify it, run the state machine, append
    /// history and persist, retrying classification when a concurrent
    /// writer wins the race.
    pub fn ingest(&self, alert: Alert) -> Result<(ProblemRecord, IngestOutcome)> {
        let ctx = ReceiveContext::new(&alert.id).log_context();

        log::info!(
            "{} ALERT_RECEIVED environment={} resource={} event={} severity={}",
            ctx,
            alert.environment,
            alert.resource,
            alert.event,
            alert.severity
        );

        validate_alert(&alert)?;
        let alert = self.run_pre_receive(alert, &ctx)?;

        let mut attempt = 0;
        let (record, outcome) = loop {
            attempt += 1;
            if attempt > self.config.max_conflict_retries {
                return Err(EngineError::Conflict(format!(
                    "classification kept losing races for {}/{}",
                    alert.resource, alert.event
                )));
            }

            let suppressed = self
                .store
                .find_active_suppression(&suppression_query(&alert))?;
            if suppressed {
                log::info!(
                    "{} ALERT_SUPPRESSED environment={} resource={} event={}",
                    ctx,
                    alert.environment,
                    alert.resource,
                    alert.event
                );
            }

            match classify(self.store.as_ref(), &alert, &ctx)? {
                Classification::Duplicate(existing) => {
                    if let Some(updated) = self.dedup(&alert, &existing, suppressed, &ctx)? {
                        break (updated, IngestOutcome::Duplicate);
                    }
                }
                Classification::Correlated(existing) => {
                    if let Some(updated) = self.correlate(&alert, &existing, suppressed, &ctx)? {
                        break (updated, IngestOutcome::Correlated);
                    }
                }
                Classification::New => {
                    if let Some(created) = self.create(&alert, suppressed, &ctx)? {
                        break (created, IngestOutcome::Created);
                    }
                }
            }

            // the record changed out from under this classification;
            // re-run it from scratch
            log::warn!("{} CLASSIFY_RETRY attempt={}", ctx, attempt);
        };

        self.run_post_receive(&record, &ctx)?;

        log::info!(
            "{} ALERT_PROCESSED outcome={} record={} status={} duplicate_count={}",
            ctx,
            outcome.as_str(),
            record.short_id(),
            record.status,
            record.duplicate_count
        );

        Ok((record, outcome))
    }

    /// Brand-new problem: assign identity, run the state machine from the
    /// default status, append the initial history and insert.
    fn create(
        &self,
        alert: &Alert,
        suppressed: bool,
        ctx: &LogContext,
    ) -> Result<Option<ProblemRecord>> {
        let now = Utc::now();

        let next = if suppressed {
            Transition {
                severity: alert.severity,
                status: Status::Blackout,
            }
        } else {
            self.machine.transition(TransitionInput {
                current_severity: alert.severity,
                previous_severity: self.config.default_previous_severity,
                current_status: self.config.default_status,
                previous_status: self.config.default_status,
                requested_status: alert.status,
                action: None,
            })?
        };

        let mut record = ProblemRecord::from_alert(alert, &self.config, now);
        record.severity = next.severity;
        record.status = next.status;
        record.trend_indication = trend(self.config.default_previous_severity, alert.severity);

        record.push_history(
            HistoryEntry::severity(
                &alert.id,
                &alert.event,
                next.severity,
                &alert.value,
                &alert.text,
                now,
            ),
            self.config.history_limit,
        );
        if next.status != self.config.default_status {
            record.push_history(
                HistoryEntry::status(
                    &alert.id,
                    &alert.event,
                    next.status,
                    "new alert status change",
                    now,
                ),
                self.config.history_limit,
            );
        }

        match self.store.atomic_create(record)? {
            CreateOutcome::Created(created) => {
                log::info!(
                    "{} ALERT_CREATED record={} status={}",
                    ctx,
                    created.short_id(),
                    created.status
                );
                Ok(Some(created))
            }
            CreateOutcome::KeyConflict => {
                // another writer created the record between the matcher's
                // read and this insert
                log::warn!("{} CREATE_CONFLICT event={}", ctx, alert.event);
                Ok(None)
            }
        }
    }

    /// Exact duplicate: bump the counter and refresh mutable fields.
    /// `previous_severity`/`previous_status` never mutate on this branch;
    /// the state machine only runs to reconcile a blackout window ending
    /// or an externally-set status.
    fn dedup(
        &self,
        alert: &Alert,
        existing: &ProblemRecord,
        suppressed: bool,
        ctx: &LogContext,
    ) -> Result<Option<ProblemRecord>> {
        let now = Utc::now();

        let next = if suppressed {
            Transition {
                severity: alert.severity,
                status: Status::Blackout,
            }
        } else if existing.status == Status::Blackout || alert.status.is_some() {
            self.machine.transition(TransitionInput {
                current_severity: alert.severity,
                previous_severity: existing.previous_severity,
                current_status: existing.status,
                previous_status: existing
                    .previous_status
                    .unwrap_or(self.config.default_status),
                requested_status: alert.status,
                action: None,
            })?
        } else {
            Transition {
                severity: existing.severity,
                status: existing.status,
            }
        };

        let mut mutation = Mutation {
            severity: Some(next.severity),
            value: Some(alert.value.clone()),
            text: Some(alert.text.clone()),
            timeout: Some(alert.timeout.unwrap_or(self.config.default_timeout_secs)),
            raw_data: alert.raw_data.clone(),
            repeat: Some(true),
            increment_duplicate_count: true,
            last_receive_id: Some(alert.id.clone()),
            last_receive_time: Some(now),
            merge_tags: alert.tags.clone(),
            merge_attributes: alert.attributes.clone(),
            history_limit: Some(self.config.history_limit),
            ..Mutation::default()
        };
        if next.status != existing.status {
            mutation.status = Some(next.status);
            mutation.append_history.push(HistoryEntry::status(
                &alert.id,
                &alert.event,
                next.status,
                "duplicate alert status change",
                now,
            ));
        }

        let updated = self
            .store
            .atomic_update(&RecordSelector::Duplicate(alert.match_key()), &mutation)?;
        if updated.is_some() {
            log::debug!("{} ALERT_DEDUPED record={}", ctx, existing.short_id());
        }
        Ok(updated)
    }

    /// Correlated event: the problem takes on a new identity. Resets the
    /// duplicate counter and records the severity the record held just
    /// before this write.
    fn correlate(
        &self,
        alert: &Alert,
        existing: &ProblemRecord,
        suppressed: bool,
        ctx: &LogContext,
    ) -> Result<Option<ProblemRecord>> {
        let now = Utc::now();
        let previous_severity = existing.severity;

        let next = if suppressed {
            Transition {
                severity: alert.severity,
                status: Status::Blackout,
            }
        } else {
            self.machine.transition(TransitionInput {
                current_severity: alert.severity,
                previous_severity,
                current_status: existing.status,
                previous_status: existing
                    .previous_status
                    .unwrap_or(self.config.default_status),
                requested_status: alert.status,
                action: None,
            })?
        };

        let mut mutation = Mutation {
            event: Some(alert.event.clone()),
            severity: Some(next.severity),
            previous_severity: Some(previous_severity),
            trend_indication: Some(trend(previous_severity, alert.severity)),
            value: Some(alert.value.clone()),
            text: Some(alert.text.clone()),
            timeout: Some(alert.timeout.unwrap_or(self.config.default_timeout_secs)),
            raw_data: alert.raw_data.clone(),
            repeat: Some(false),
            reset_duplicate_count: true,
            create_time: Some(alert.create_time),
            last_receive_id: Some(alert.id.clone()),
            last_receive_time: Some(now),
            replace_correlate: if alert.correlate.is_empty() {
                None
            } else {
                Some(alert.correlate.clone())
            },
            merge_tags: alert.tags.clone(),
            merge_attributes: alert.attributes.clone(),
            history_limit: Some(self.config.history_limit),
            ..Mutation::default()
        };
        mutation.append_history.push(HistoryEntry::severity(
            &alert.id,
            &alert.event,
            next.severity,
            &alert.value,
            &alert.text,
            now,
        ));
        if next.status != existing.status {
            mutation.status = Some(next.status);
            mutation.previous_status = Some(existing.status);
            mutation.append_history.push(HistoryEntry::status(
                &alert.id,
                &alert.event,
                next.status,
                "correlated alert status change",
                now,
            ));
        }

        let updated = self.store.atomic_update(
            &RecordSelector::Correlated {
                key: alert.correlation_key(),
                event: alert.event.clone(),
                severity: alert.severity,
                correlate: alert.correlate.clone(),
            },
            &mutation,
        )?;
        if updated.is_some() {
            log::debug!(
                "{} ALERT_CORRELATED record={} event={} trend={}",
                ctx,
                existing.short_id(),
                alert.event,
                trend(previous_severity, alert.severity)
            );
        }
        Ok(updated)
    }

    fn run_pre_receive(&self, mut alert: Alert, ctx: &LogContext) -> Result<Alert> {
        for plugin in &self.plugins {
            match plugin.pre_receive(alert) {
                Ok(PreReceive::Accept(accepted)) => alert = accepted,
                Ok(PreReceive::Reject(reason)) => {
                    log::info!(
                        "{} ALERT_REJECTED plugin={} reason={}",
                        ctx,
                        plugin.name(),
                        reason
                    );
                    return Err(EngineError::Rejected(reason));
                }
                Err(err) => {
                    log::error!(
                        "{} HOOK_FAILED plugin={} stage=pre_receive error={}",
                        ctx,
                        plugin.name(),
                        err
                    );
                    return Err(EngineError::HookFailure(err));
                }
            }
        }
        Ok(alert)
    }

    fn run_post_receive(&self, record: &ProblemRecord, ctx: &LogContext) -> Result<()> {
        for plugin in &self.plugins {
            if let Err(err) = plugin.post_receive(record) {
                // the record is already durable; the failure is surfaced,
                // not swallowed
                log::error!(
                    "{} HOOK_FAILED plugin={} stage=post_receive error={}",
                    ctx,
                    plugin.name(),
                    err
                );
                return Err(EngineError::HookFailure(err));
            }
        }
        Ok(())
    }
}

fn suppression_query(alert: &Alert) -> SuppressionQuery<'_> {
    SuppressionQuery {
        environment: &alert.environment,
        resource: &alert.resource,
        service: &alert.service,
        event: &alert.event,
        group: alert.group.as_deref(),
        tags: &alert.tags,
        customer: alert.customer.as_deref(),
        at: alert.create_time,
    }
}
