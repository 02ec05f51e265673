//! Client error types.

use thiserror::Error;

/// Failure of an outbound send. Reported to the caller only, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// There is no socket (never configured, bad config, or closed).
    #[error("WebSocket is not connected")]
    NotConnected,

    /// The socket exists but has not finished opening.
    #[error("WebSocket is not open")]
    NotOpen,

    /// Writing the frame failed.
    #[error("WebSocket send failed: {0}")]
    Transport(String),

    /// The supervisor is no longer running.
    #[error("Supervisor stopped")]
    Stopped,
}

/// Failure of a supervisor handle call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The supervisor is no longer running.
    #[error("Supervisor stopped")]
    Stopped,
}
