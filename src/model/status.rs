//! Alarm status and operator action vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a problem record.
///
/// The lifecycle is cyclic: `closed` and `expired` both return to `open`
/// on a new non-normal severity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Assign,
    Ack,
    Shelved,
    Blackout,
    Closed,
    Expired,
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Assign => "assign",
            Status::Ack => "ack",
            Status::Shelved => "shelved",
            Status::Blackout => "blackout",
            Status::Closed => "closed",
            Status::Expired => "expired",
            Status::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "assign" => Ok(Status::Assign),
            "ack" => Ok(Status::Ack),
            "shelved" => Ok(Status::Shelved),
            "blackout" => Ok(Status::Blackout),
            "closed" => Ok(Status::Closed),
            "expired" => Ok(Status::Expired),
            "unknown" => Ok(Status::Unknown),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Operator or housekeeping action applied to a record.
///
/// Parsing never fails: strings outside the recognized vocabulary become
/// `External`, which the state machine treats as "status already decided
/// by a plugin" (identity transition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Open,
    Assign,
    Ack,
    Unack,
    Shelve,
    Unshelve,
    Close,
    Expired,
    Timeout,
    External(String),
}

impl Action {
    pub fn parse(s: &str) -> Action {
        match s.to_ascii_lowercase().as_str() {
            "open" => Action::Open,
            "assign" => Action::Assign,
            "ack" => Action::Ack,
            "unack" => Action::Unack,
            "shelve" => Action::Shelve,
            "unshelve" => Action::Unshelve,
            "close" => Action::Close,
            "expired" => Action::Expired,
            "timeout" => Action::Timeout,
            other => Action::External(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::Open => "open",
            Action::Assign => "assign",
            Action::Ack => "ack",
            Action::Unack => "unack",
            Action::Shelve => "shelve",
            Action::Unshelve => "unshelve",
            Action::Close => "close",
            Action::Expired => "expired",
            Action::Timeout => "timeout",
            Action::External(name) => name,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
