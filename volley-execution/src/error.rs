//! Error types for running thread groups

use thiserror::Error;
use volley_config::ConfigError;
use volley_control::ControlError;

/// Execution result type
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Errors that stop a run before its virtual users start, or end one user
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Plan preparation failed: {0}")]
    Control(#[from] ControlError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start virtual user '{name}': {message}")]
    ThreadSpawn { name: String, message: String },

    /// An endless run without a duration stopped producing work items
    #[error("Main loop yielded no work items for {passes} passes in a row")]
    IdlePlan { passes: u64 },
}
