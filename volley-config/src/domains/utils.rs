//! Utility functions and helpers for configuration

use std::time::Duration;

/// Parse a human readable duration such as `90s`, `1m 30s` or `250ms`
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value.trim()).map_err(|e| e.to_string())
}

/// Default functions for serde
pub fn default_true() -> bool {
    true
}
