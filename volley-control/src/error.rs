//! Traversal and plan resolution errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type for the control crate
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised while preparing or traversing a plan
#[derive(Debug, Error)]
pub enum ControlError {
    /// A module controller's target path does not exist in the plan
    #[error("Module controller '{node}' could not find its target '{path}'")]
    ModuleTargetNotFound { node: String, path: String },

    /// A module controller points at another module controller
    #[error("Module controller '{node}' targets module controller '{target}'")]
    RecursiveModule { node: String, target: String },

    /// Module/include expansion came back to an element already being expanded
    #[error("Replacement cycle at '{node}': {chain}")]
    ReplacementCycle { node: String, chain: String },

    /// Structurally invalid plan
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// A single `next()` call exceeded its step budget without yielding
    #[error("Traversal of '{node}' made no progress within {steps} steps")]
    RunawayTraversal { steps: usize, node: String },

    /// A plan file could not be loaded
    #[error("Plan load failed: {0}")]
    Load(#[from] LoadError),
}

impl ControlError {
    /// Whether the error must stop the test rather than degrade one node
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ControlError::Load(_))
    }
}

/// Errors loading a plan file; never fatal when raised by an include
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Include path is empty")]
    EmptyPath,

    #[error("Plan file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported plan format for {} (expected .yaml, .yml or .json)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("Include cycle through {0}")]
    Recursive(String),
}
