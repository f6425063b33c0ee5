//! Periodic housekeeping sweep.
//!
//! Runs on the caller's schedule, concurrently with ingestion, and
//! honors the same store atomicity: every state change goes through the
//! normal action path's single atomic update. Records that vanish
//! mid-sweep are skipped, not errors.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::logging::LogContext;
use crate::model::Action;

use super::ingestion::Engine;

/// What one housekeeping run did.
#[derive(Debug, Default)]
pub struct HousekeepingReport {
    /// Records transitioned to `expired`.
    pub expired: Vec<String>,
    /// Shelved records reverted after their shelve timeout.
    pub unshelved: Vec<String>,
    /// Records removed by retention. Deletion is unconditional and
    /// irreversible; no history survives it.
    pub deleted: Vec<String>,
}

impl Engine {
    /// Run one housekeeping sweep.
    ///
    /// `expired_delete_after_hrs` bounds how long closed/expired records
    /// are retained; `info_delete_after_hrs` bounds informational-severity
    /// records. Zero disables the respective retention delete.
    pub fn run_housekeeping(
        &self,
        expired_delete_after_hrs: i64,
        info_delete_after_hrs: i64,
    ) -> Result<HousekeepingReport> {
        let now = Utc::now();
        let ctx = LogContext::new(&format!("sweep-{}", &Uuid::new_v4().to_string()[..8]));
        let mut report = HousekeepingReport::default();

        for record in self.store.sweep_expired(now)? {
            match self.apply_action(&record.id, Action::Expired, Some("expired after timeout"), None)
            {
                Ok(_) => report.expired.push(record.id),
                // deleted or already transitioned by a concurrent writer
                Err(EngineError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }

        for record in self.store.sweep_shelve_timeouts(now)? {
            match self.apply_action(&record.id, Action::Timeout, Some("shelve timeout"), None) {
                Ok(_) => report.unshelved.push(record.id),
                Err(EngineError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }

        if expired_delete_after_hrs > 0 {
            let cutoff = now - Duration::hours(expired_delete_after_hrs);
            report
                .deleted
                .extend(self.store.delete_resolved_before(cutoff)?);
        }
        if info_delete_after_hrs > 0 {
            let cutoff = now - Duration::hours(info_delete_after_hrs);
            report
                .deleted
                .extend(self.store.delete_informational_before(cutoff)?);
        }

        log::info!(
            "{} HOUSEKEEPING_COMPLETE expired={} unshelved={} deleted={}",
            ctx,
            report.expired.len(),
            report.unshelved.len(),
            report.deleted.len()
        );

        Ok(report)
    }
}
