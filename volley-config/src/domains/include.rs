//! Include controller configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Include controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeConfig {
    /// Directory prepended to relative include paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    /// Load each included file once per test start
    #[serde(default = "crate::domains::utils::default_true")]
    pub cache: bool,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            cache: true,
        }
    }
}

impl Validatable for IncludeConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(base_dir) = &self.base_dir {
            validate_required_string(&base_dir.to_string_lossy(), "base_dir", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "include"
    }
}
