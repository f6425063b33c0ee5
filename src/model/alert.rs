//! Inbound alert events and boundary validation.
//!
//! An `Alert` is what a monitoring source sends; the pipeline classifies
//! it against existing problem records. Validation runs before
//! classification and rejects malformed events with no side effects.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::model::record::{CorrelationKey, MatchKey};
use crate::model::severity::Severity;
use crate::model::status::Status;

lazy_static! {
    /// Attribute keys containing these characters can be abused for
    /// store-specific injection (dotted paths, operator prefixes) and are
    /// rejected at the boundary regardless of the target store.
    static ref FORBIDDEN_ATTR_KEY: Regex = Regex::new(r"[.$]").unwrap();
}

fn new_event_id() -> String {
    Uuid::new_v4().to_string()
}

/// A monitoring event as received from a source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default = "new_event_id")]
    pub id: String,
    pub environment: String,
    pub resource: String,
    pub event: String,
    #[serde(default)]
    pub severity: Severity,
    /// Alternate event names considered the same logical problem.
    #[serde(default)]
    pub correlate: Vec<String>,
    /// Explicit status, e.g. set directly by a webhook. Rarely present.
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub service: Vec<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form attributes. `Null` values delete the key on merge.
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default = "Utc::now")]
    pub create_time: DateTime<Utc>,
    /// Seconds until auto-expiry; `None` takes the configured default,
    /// zero disables expiry.
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(default)]
    pub raw_data: Option<String>,
    /// Tenant partition. Records never match across tenants.
    #[serde(default)]
    pub customer: Option<String>,
}

impl Alert {
    pub fn new(environment: &str, resource: &str, event: &str, severity: Severity) -> Self {
        Self {
            id: new_event_id(),
            environment: environment.to_string(),
            resource: resource.to_string(),
            event: event.to_string(),
            severity,
            correlate: Vec::new(),
            status: None,
            service: Vec::new(),
            group: None,
            value: String::new(),
            text: String::new(),
            tags: Vec::new(),
            attributes: BTreeMap::new(),
            origin: None,
            create_time: Utc::now(),
            timeout: None,
            raw_data: None,
            customer: None,
        }
    }

    /// Exact-duplicate matching key.
    pub fn match_key(&self) -> MatchKey {
        MatchKey {
            environment: self.environment.clone(),
            resource: self.resource.clone(),
            event: self.event.clone(),
            severity: self.severity,
            customer: self.customer.clone(),
        }
    }

    /// Correlation matching key (event membership checked separately).
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
}

/// Validate an inbound alert before classification.
pub fn validate_alert(alert: &Alert) -> Result<()> {
    if alert.resource.trim().is_empty() {
        return Err(EngineError::Validation("missing resource".to_string()));
    }
    if alert.event.trim().is_empty() {
        return Err(EngineError::Validation("missing event".to_string()));
    }
    if alert.environment.trim().is_empty() {
        return Err(EngineError::Validation("missing environment".to_string()));
    }
    for key in alert.attributes.keys() {
        if key.is_empty() {
            return Err(EngineError::Validation(
                "attribute keys must not be empty".to_string(),
            ));
        }
        if FORBIDDEN_ATTR_KEY.is_match(key) {
            return Err(EngineError::Validation(format!(
                "attribute key '{}' must not contain '.' or '$'",
                key
            )));
        }
    }
    Ok(())
}
