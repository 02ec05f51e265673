//! Core error types.

use thiserror::Error;

/// Errors that can occur while validating, loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No endpoint URL is configured.
    #[error("WS URL is not defined")]
    MissingUrl,

    /// The endpoint URL does not match `ws[s]://host[:port][/path]`.
    #[error("WS URL is invalid: {0}")]
    InvalidUrl(String),

    /// A feedback prefix or suffix contains characters outside the allowed set.
    #[error("Invalid characters in feedback {field}: {value}")]
    InvalidAffix { field: &'static str, value: String },

    /// The heartbeat timeout is not a positive integer.
    #[error("Invalid heartbeat timeout: {0}")]
    InvalidTimeout(String),

    /// The requested configuration was not found.
    #[error("Configuration not found: {0}")]
    NotFound(String),

    /// Failed to read configuration.
    #[error("Read error: {0}")]
    ReadError(String),

    /// Failed to write configuration.
    #[error("Write error: {0}")]
    WriteError(String),

    /// Configuration data is invalid.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
