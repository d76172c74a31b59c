//! Execution driver for Volley
//!
//! A [`ThreadGroup`] resolves and compiles its plan once, then starts one OS
//! thread per virtual user. Every user owns a [`ThreadContext`] and a
//! [`Traversal`] over the shared plan, hands each work item to a
//! [`SampleExecutor`] and records the outcome in `LAST_SAMPLE_OK`.
//!
//! [`ThreadContext`]: volley_core::ThreadContext
//! [`Traversal`]: volley_control::Traversal

pub mod error;
pub mod executor;
pub mod group;
pub mod stop;
pub mod user;

pub use error::{ExecutionError, ExecutionResult};
pub use executor::{LoggingExecutor, RecordingExecutor, SampleExecutor, SampleOutcome, SampleRecord};
pub use group::{RunSummary, ThreadGroup};
pub use stop::StopSignal;
pub use user::{UserSummary, VirtualUser};
