//! Blackout suppression windows.
//!
//! Time-bounded, criteria-matched windows that force matching alerts into
//! `blackout` status regardless of severity.

pub mod blackout;

pub use blackout::*;
