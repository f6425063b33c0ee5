//! Correlation matching.
//!
//! Classifies an inbound event against existing problem records as a
//! duplicate, a correlation, or a brand-new problem.

pub mod matcher;

pub use matcher::*;
