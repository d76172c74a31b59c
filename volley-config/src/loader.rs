//! Configuration loading and environment variable handling

use crate::domains::engine::EngineConfig;
use crate::domains::include::IncludeConfig;
use crate::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::domains::threads::ThreadsConfig;
use crate::domains::utils::parse_duration;
use crate::domains::VolleyConfig;
use crate::error::{ConfigError, ConfigResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "VOLLEY".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load a YAML (or `.json`) configuration file, then apply environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<VolleyConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: VolleyConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?,
            _ => serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?,
        };

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<VolleyConfig> {
        let mut config = VolleyConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<VolleyConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut VolleyConfig) -> ConfigResult<()> {
        self.apply_engine_overrides(&mut config.engine)?;
        self.apply_threads_overrides(&mut config.threads)?;
        self.apply_include_overrides(&mut config.include);
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_engine_overrides(&self, config: &mut EngineConfig) -> ConfigResult<()> {
        if let Some(max_steps) = self.env_override("MAX_STEPS", |raw| raw.parse())? {
            config.max_steps_per_call = max_steps;
        }
        if let Some(max_idle) = self.env_override("MAX_IDLE_PASSES", |raw| raw.parse())? {
            config.max_idle_passes = max_idle;
        }
        if let Some(seed) = self.env_override("RANDOM_SEED", |raw| raw.parse())? {
            config.random_seed = Some(seed);
        }
        Ok(())
    }

    fn apply_threads_overrides(&self, config: &mut ThreadsConfig) -> ConfigResult<()> {
        if let Some(threads) = self.env_override("THREADS", |raw| raw.parse())? {
            config.num_threads = threads;
        }
        if let Some(loops) = self.env_override("LOOPS", |raw| raw.parse())? {
            config.loops = loops;
        }
        if let Some(ramp_up) = self.env_override("RAMP_UP", parse_duration)? {
            config.ramp_up = ramp_up;
        }
        if let Some(duration) = self.env_override("DURATION", parse_duration)? {
            config.duration = Some(duration);
        }
        Ok(())
    }

    fn apply_include_overrides(&self, config: &mut IncludeConfig) {
        if let Ok(base_dir) = self.get_env_var("INCLUDE_BASE_DIR") {
            config.base_dir = Some(PathBuf::from(base_dir));
        }
    }

    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Some(level) = self.env_override("LOG_LEVEL", LogLevel::from_str)? {
            config.level = level;
        }
        if let Some(format) = self.env_override("LOG_FORMAT", LogFormat::from_str)? {
            config.format = format;
        }
        Ok(())
    }

    /// Parse `{prefix}_{name}` when it is set
    fn env_override<T, E: fmt::Display>(
        &self,
        name: &str,
        parse: impl FnOnce(&str) -> Result<T, E>,
    ) -> ConfigResult<Option<T>> {
        let Ok(value) = self.get_env_var(name) else {
            return Ok(None);
        };
        parse(value.trim())
            .map(Some)
            .map_err(|e| ConfigError::EnvOverride {
                var: format!("{}_{}", self.prefix, name),
                value,
                reason: e.to_string(),
            })
    }

    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
