//! Configuration error types.

use thiserror::Error;

/// Configuration error type.
///
/// All variants are fatal at startup; nothing here is recoverable at
/// runtime because configuration is immutable for the process lifetime.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required field is missing or empty
    #[error("Missing required configuration field: {0}")]
    MissingField(&'static str),

    /// A configured plugin name has no registered implementation
    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    /// A field is present but its value is unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
