//! Core domain types for Volley
//!
//! This crate defines the vocabulary shared by the traversal engine and the
//! execution driver: the opaque work item a plan yields, and the per-thread
//! context (variables and counters) that controllers read and write.

pub mod context;
pub mod item;
pub mod substitute;

// Re-export commonly used types at the crate root
pub use context::{ThreadContext, Variables, LAST_SAMPLE_OK};
pub use item::WorkItem;
pub use substitute::substitute;
