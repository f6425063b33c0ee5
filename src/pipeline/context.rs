//! Per-receive context.
//!
//! Gives every ingest or action call a receive id for log correlation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::LogContext;

/// Context for one receive (ingest or operator action).
#[derive(Debug, Clone)]
pub struct ReceiveContext {
    pub receive_id: String,
    pub alert_id: String,
    pub received_at: DateTime<Utc>,
}

impl ReceiveContext {
    pub fn new(alert_id: &str) -> Self {
        let receive_id = format!("recv-{}", &Uuid::new_v4().to_string()[..8]);
        Self {
            receive_id,
            alert_id: alert_id.to_string(),
            received_at: Utc::now(),
        }
    }

    pub fn log_context(&self) -> LogContext {
        let end = self.alert_id.len().min(8);
        LogContext::new(&self.receive_id).with_alert(&self.alert_id[..end])
    }
}
