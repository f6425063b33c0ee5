//! Blackout window model and specificity-ordered matching.
//!
//! A window matches an alert when the environment matches and every
//! criterion the window defines (resource, service, event, group, tags,
//! customer) matches too. Candidates are evaluated most-specific-first:
//! resource+event+group+tags outranks an environment-only window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time-bounded suppression window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blackout {
    pub id: String,
    pub environment: String,
    #[serde(default)]
    pub service: Vec<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Tenanted windows only suppress their own tenant's alerts.
    #[serde(default)]
    pub customer: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// The alert fields a suppression lookup matches against.
#[derive(Debug, Clone)]
pub struct SuppressionQuery<'a> {
    pub environment: &'a str,
    pub resource: &'a str,
    pub service: &'a [String],
    pub event: &'a str,
    pub group: Option<&'a str>,
    pub tags: &'a [String],
    pub customer: Option<&'a str>,
    pub at: DateTime<Utc>,
}

impl Blackout {
    pub fn new(environment: &str, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            environment: environment.to_string(),
            service: Vec::new(),
            resource: None,
            event: None,
            group: None,
            tags: Vec::new(),
            customer: None,
            start_time,
            end_time,
        }
    }

    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at < self.end_time
    }

    /// Specificity score; higher wins when several windows match.
    pub fn priority(&self) -> u32 {
        let mut score = 0;
        if self.resource.is_some() {
            score += 4;
        }
        if self.event.is_some() {
            score += 4;
        }
        if !self.service.is_empty() {
            score += 2;
        }
        if self.group.is_some() {
            score += 2;
        }
        if !self.tags.is_empty() {
            score += 1;
        }
        score
    }

    /// Whether this window suppresses the queried alert at the queried
    /// time. Every criterion the window defines must match.
    pub fn matches(&self, query: &SuppressionQuery<'_>) -> bool {
        if !self.is_active_at(query.at) {
            return false;
        }
        if self.environment != query.environment {
            return false;
        }
        if let Some(customer) = &self.customer {
            if query.customer != Some(customer.as_str()) {
                return false;
            }
        }
        if let Some(resource) = &self.resource {
            if resource != query.resource {
                return false;
            }
        }
        if let Some(event) = &self.event {
            if event != query.event {
                return false;
            }
        }
        if let Some(group) = &self.group {
            if query.group != Some(group.as_str()) {
                return false;
            }
        }
        if !self.service.is_empty() && !self.service.iter().any(|s| query.service.contains(s)) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().all(|t| query.tags.contains(t)) {
            return false;
        }
        true
    }
}
