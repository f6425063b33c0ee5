//! Severity levels and trend derivation.
//!
//! Severities form a total order by numeric code; a lower code is more
//! severe. The trend between two severities is always recomputed from the
//! codes, never carried over from a previous write.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Alert severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Security,
    Critical,
    Major,
    Minor,
    Warning,
    Indeterminate,
    Informational,
    #[serde(alias = "ok", alias = "cleared")]
    Normal,
    Debug,
    Trace,
    Unknown,
}

impl Severity {
    /// Numeric code used for ordering. Lower is more severe.
    pub fn code(&self) -> u8 {
        match self {
            Severity::Security => 0,
            Severity::Critical => 1,
            Severity::Major => 2,
            Severity::Minor => 3,
            Severity::Warning => 4,
            Severity::Indeterminate => 5,
            Severity::Informational => 6,
            Severity::Normal => 7,
            Severity::Debug => 8,
            Severity::Trace => 9,
            Severity::Unknown => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Security => "security",
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Warning => "warning",
            Severity::Indeterminate => "indeterminate",
            Severity::Informational => "informational",
            Severity::Normal => "normal",
            Severity::Debug => "debug",
            Severity::Trace => "trace",
            Severity::Unknown => "unknown",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Normal
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "security" => Ok(Severity::Security),
            "critical" => Ok(Severity::Critical),
            "major" => Ok(Severity::Major),
            "minor" => Ok(Severity::Minor),
            "warning" => Ok(Severity::Warning),
            "indeterminate" => Ok(Severity::Indeterminate),
            "informational" => Ok(Severity::Informational),
            "normal" | "ok" | "cleared" => Ok(Severity::Normal),
            "debug" => Ok(Severity::Debug),
            "trace" => Ok(Severity::Trace),
            "unknown" => Ok(Severity::Unknown),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// Direction of a severity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendIndication {
    MoreSevere,
    NoChange,
    LessSevere,
}

impl fmt::Display for TrendIndication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendIndication::MoreSevere => "moreSevere",
            TrendIndication::NoChange => "noChange",
            TrendIndication::LessSevere => "lessSevere",
        };
        f.write_str(s)
    }
}

/// Compare two severities under the total order.
pub fn trend(previous: Severity, current: Severity) -> TrendIndication {
    if previous.code() > current.code() {
        TrendIndication::MoreSevere
    } else if previous.code() < current.code() {
        TrendIndication::LessSevere
    } else {
        TrendIndication::NoChange
    }
}
