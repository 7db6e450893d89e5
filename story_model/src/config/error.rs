//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, writing or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("invalid TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML config: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
