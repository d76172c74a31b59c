//! Thread group configuration

use crate::error::ConfigResult;
use crate::validation::{validate_loop_count, validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thread group configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadsConfig {
    /// Name used as the prefix of every virtual user's thread name
    #[serde(default = "default_group_name")]
    pub group_name: String,

    /// Number of virtual users
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,

    /// Main loop iterations per user, `-1` for forever
    #[serde(default = "default_loops")]
    pub loops: i64,

    /// Time over which all users are started, e.g. `30s`
    #[serde(with = "humantime_serde", default = "default_ramp_up")]
    pub ramp_up: Duration,

    /// Optional wall-clock limit for the whole run, e.g. `5m`
    #[serde(with = "humantime_serde", default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            group_name: default_group_name(),
            num_threads: default_num_threads(),
            loops: default_loops(),
            ramp_up: default_ramp_up(),
            duration: None,
        }
    }
}

impl Validatable for ThreadsConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.group_name, "group_name", self.domain_name())?;
        validate_positive(self.num_threads, "num_threads", self.domain_name())?;
        validate_loop_count(self.loops, "loops", self.domain_name())?;

        if self.loops == -1 && self.duration.is_none() {
            tracing::warn!("Thread group loops forever and has no duration limit");
        }

        if let Some(duration) = self.duration {
            if duration.is_zero() {
                return Err(self.validation_error("duration must be greater than 0 when set"));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "threads"
    }
}

fn default_group_name() -> String {
    "Thread Group".to_string()
}

fn default_num_threads() -> usize {
    1
}

fn default_loops() -> i64 {
    1
}

fn default_ramp_up() -> Duration {
    Duration::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threads_defaults() {
        let config = ThreadsConfig::default();
        assert_eq!(config.num_threads, 1);
        assert_eq!(config.loops, 1);
        assert_eq!(config.ramp_up, Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threads_validation() {
        let mut config = ThreadsConfig {
            num_threads: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.num_threads = 2;
        config.loops = -3;
        assert!(config.validate().is_err());

        config.loops = -1;
        config.duration = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
