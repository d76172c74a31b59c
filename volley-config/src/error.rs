use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Why a Volley configuration could not be produced
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration {} is not valid YAML: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A `VOLLEY_*` variable held a value its setting cannot take
    #[error("{var}={value} rejected: {reason}")]
    EnvOverride {
        var: String,
        value: String,
        reason: String,
    },

    /// A setting is out of range after loading and overrides
    #[error("[{domain}] {message}")]
    Invalid { domain: String, message: String },
}
