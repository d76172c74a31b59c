//! Traversal engine configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};

/// Traversal engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on internal steps a single `next()` call may take before
    /// the traversal is declared runaway
    #[serde(default = "default_max_steps_per_call")]
    pub max_steps_per_call: usize,

    /// Consecutive main-loop passes without a work item after which an
    /// endless run with no duration is abandoned
    #[serde(default = "default_max_idle_passes")]
    pub max_idle_passes: u64,

    /// Seed for per-thread randomness (random order, unseeded weighted
    /// distribution). Thread `n` uses `seed + n`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps_per_call: default_max_steps_per_call(),
            max_idle_passes: default_max_idle_passes(),
            random_seed: None,
        }
    }
}

impl Validatable for EngineConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.max_steps_per_call, "max_steps_per_call", self.domain_name())?;
        validate_positive(self.max_idle_passes, "max_idle_passes", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "engine"
    }
}

fn default_max_steps_per_call() -> usize {
    100_000
}

fn default_max_idle_passes() -> u64 {
    1_000
}
