//! Domain-specific configuration modules

pub mod engine;
pub mod include;
pub mod logging;
pub mod threads;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Volley configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VolleyConfig {
    /// Traversal engine configuration
    #[serde(default)]
    pub engine: engine::EngineConfig,

    /// Thread group configuration
    #[serde(default)]
    pub threads: threads::ThreadsConfig,

    /// Include controller configuration
    #[serde(default)]
    pub include: include::IncludeConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl VolleyConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.engine.validate()?;
        self.threads.validate()?;
        self.include.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = VolleyConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
