//! Configuration errors.
//!
//! Each orchestration module owns its own error enum (`RunError`,
//! `TaskError`, `ReleaseError`, ...); this one covers loading config files.

use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config file or environment override did not match the schema.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
