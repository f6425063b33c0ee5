//! Alarm state machine.
//!
//! A pure transition function over severity, status and operator action.
//! Stateless and safely shared read-only across concurrent invocations.

pub mod machine;

pub use machine::*;
