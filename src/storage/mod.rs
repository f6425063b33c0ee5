//! Storage module.
//!
//! The persistence contract the pipeline writes through, the
//! storage-agnostic mutation description, and an in-memory reference
//! backend with the required atomicity semantics.

pub mod contract;
pub mod memory;

pub use contract::*;
pub use memory::*;
