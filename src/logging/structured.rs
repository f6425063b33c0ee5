//! Structured logging utilities.
//!
//! Provides context-aware logging with receive_id and alert_id included
//! in every log message.

use std::fmt;

/// Logging context for one receive (ingest or action call).
#[derive(Debug, Clone)]
pub struct LogContext {
    pub receive_id: String,
    pub alert_id: Option<String>,
}

impl LogContext {
    pub fn new(receive_id: &str) -> Self {
        Self {
            receive_id: receive_id.to_string(),
            alert_id: None,
        }
    }

    pub fn with_alert(&self, alert_id: &str) -> Self {
        Self {
            receive_id: self.receive_id.clone(),
            alert_id: Some(alert_id.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alert_id {
            Some(aid) => write!(f, "[receive={}] [alert={}]", self.receive_id, aid),
            None => write!(f, "[receive={}]", self.receive_id),
        }
    }
}
