//! The alarm lifecycle transition function.
//!
//! `transition` is pure: no clock, no randomness, no stored state. Rules
//! are evaluated in precedence order and the first match wins; each fired
//! rule is logged with its label so transitions can be audited.
//!
//! Violating a precondition (e.g. `ack` while shelved) returns a typed
//! `InvalidAction` error and never mutates anything.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::{trend, Action, Severity, Status, TrendIndication};

/// Inputs to one transition.
///
/// `requested_status` carries a status explicitly set on the incoming
/// event (e.g. by a webhook writing status directly); it is distinct from
/// `current_status`, the record's stored status.
#[derive(Debug, Clone)]
pub struct TransitionInput {
    pub current_severity: Severity,
    pub previous_severity: Severity,
    pub current_status: Status,
    pub previous_status: Status,
    pub requested_status: Option<Status>,
    pub action: Option<Action>,
}

/// Result of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub severity: Severity,
    pub status: Status,
}

/// The alarm state machine, parameterized by the configured severities.
#[derive(Debug, Clone)]
pub struct StateMachine {
    normal_severity: Severity,
    default_previous_severity: Severity,
}

fn already(status: Status) -> EngineError {
    EngineError::InvalidAction(format!("alert is already in '{}' status", status))
}

fn invalid(action: &Action, status: Status) -> EngineError {
    EngineError::InvalidAction(format!(
        "invalid action '{}' for current '{}' status",
        action, status
    ))
}

impl StateMachine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            normal_severity: config.normal_severity,
            default_previous_severity: config.default_previous_severity,
        }
    }

    fn next(&self, rule: &str, severity: Severity, status: Status) -> Result<Transition> {
        log::debug!(
            "STATE_TRANSITION rule={} severity={} status={}",
            rule,
            severity,
            status
        );
        Ok(Transition { severity, status })
    }

    pub fn transition(&self, input: TransitionInput) -> Result<Transition> {
        let current = input.current_severity;
        let status = input.current_status;
        let previous_status = input.previous_status;

        // ACT-1: an action outside the recognized vocabulary means some
        // plugin already decided the state; pass it through untouched.
        if let Some(Action::External(name)) = &input.action {
            log::debug!(
                "STATE_TRANSITION rule=ACT-1 action={} severity={} status={}",
                name,
                current,
                status
            );
            return Ok(Transition {
                severity: current,
                status,
            });
        }

        // SET-1/SET-2: no action but the event carried an explicit status.
        // Reconcile: normal severity closes, anything else keeps the
        // externally-decided status.
        if input.action.is_none() {
            if let Some(requested) = input.requested_status {
                if current == self.normal_severity {
                    return self.next("SET-1", current, Status::Closed);
                }
                return self.next("SET-2", current, requested);
            }
        }

        // Actions with the same meaning from every state.
        match &input.action {
            Some(action @ Action::Unack) => {
                return if status == Status::Ack {
                    self.next("UNACK-1", current, previous_status)
                } else {
                    Err(invalid(action, status))
                };
            }
            Some(action @ Action::Unshelve) => {
                // manual unshelving returns the alert to its previous state
                return if status == Status::Shelved {
                    self.next("UNSHL-1", current, previous_status)
                } else {
                    Err(invalid(action, status))
                };
            }
            Some(Action::Expired) => {
                return self.next("EXP-0", current, Status::Expired);
            }
            Some(Action::Timeout) => {
                return if previous_status == Status::Ack {
                    self.next("TIMEOUT-1", current, Status::Ack)
                } else {
                    self.next("TIMEOUT-2", current, Status::Open)
                };
            }
            _ => {}
        }

        // Once the suppression window ends, a blackout record reverts to
        // the status it held before the window.
        if status == Status::Blackout {
            if matches!(&input.action, Some(Action::Close)) {
                return self.next("BLK-1", current, Status::Closed);
            }
            if previous_status != Status::Blackout {
                return self.next("BLK-2", current, previous_status);
            }
            return self.next("BLK-0", current, status);
        }

        match status {
            Status::Open => match &input.action {
                Some(Action::Open) => return Err(already(status)),
                Some(Action::Assign) => return self.next("OPEN-1", current, Status::Assign),
                Some(Action::Ack) => return self.next("OPEN-2", current, Status::Ack),
                Some(Action::Shelve) => return self.next("OPEN-3", current, Status::Shelved),
                Some(Action::Close) => {
                    return self.next("OPEN-4", self.normal_severity, Status::Closed)
                }
                _ => {}
            },
            Status::Assign => match &input.action {
                Some(Action::Open) => return self.next("ASGN-1", current, Status::Open),
                Some(Action::Assign) => return self.next("ASGN-0", current, Status::Assign),
                Some(Action::Ack) => return self.next("ASGN-2", current, Status::Ack),
                Some(Action::Shelve) => return self.next("ASGN-3", current, Status::Shelved),
                Some(Action::Close) => {
                    return self.next("ASGN-4", self.normal_severity, Status::Closed)
                }
                _ => {}
            },
            Status::Ack => {
                match &input.action {
                    Some(Action::Open) => return self.next("ACK-1", current, Status::Open),
                    Some(Action::Assign) => return self.next("ACK-2", current, Status::Assign),
                    Some(action @ Action::Ack) => return Err(invalid(action, status)),
                    Some(Action::Shelve) => return self.next("ACK-3", current, Status::Shelved),
                    Some(Action::Close) => {
                        return self.next("ACK-4", self.normal_severity, Status::Closed)
                    }
                    _ => {}
                }
                // re-open acknowledged alerts if the severity actually
                // increases, not just because the previous severity is
                // still the placeholder default
                if input.previous_severity != self.default_previous_severity
                    && trend(input.previous_severity, current) == TrendIndication::MoreSevere
                {
                    return self.next("ACK-5", current, Status::Open);
                }
            }
            Status::Shelved => match &input.action {
                Some(Action::Open) => return self.next("SHL-1", current, Status::Open),
                Some(action @ Action::Ack) => return Err(invalid(action, status)),
                Some(Action::Shelve) => return Err(already(status)),
                Some(Action::Close) => {
                    return self.next("SHL-2", self.normal_severity, Status::Closed)
                }
                _ => {}
            },
            Status::Closed => {
                match &input.action {
                    Some(Action::Open) => {
                        // a manual reopen restores the last real severity
                        return self.next("CLS-1", input.previous_severity, Status::Open);
                    }
                    Some(action @ (Action::Ack | Action::Shelve | Action::Assign)) => {
                        return Err(invalid(action, status));
                    }
                    Some(Action::Close) => return Err(already(status)),
                    _ => {}
                }
                if current != self.normal_severity {
                    if previous_status == Status::Shelved {
                        return self.next("CLS-2", current, Status::Shelved);
                    }
                    return self.next("CLS-3", current, Status::Open);
                }
            }
            Status::Expired => {
                if let Some(action) = &input.action {
                    if *action != Action::Open {
                        return Err(invalid(action, status));
                    }
                }
                if current != self.normal_severity {
                    return self.next("EXP-1", current, Status::Open);
                }
            }
            // Blackout handled above; Unknown falls through to the
            // severity-driven rules.
            _ => {}
        }

        // Severity back to normal closes the alert from any remaining state.
        if current == self.normal_severity {
            return self.next("NORM-1", self.normal_severity, Status::Closed);
        }

        self.next("NO-CHANGE", current, status)
    }
}
