//! Connection status reported to the host.

use serde::{Deserialize, Serialize};

/// The single observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Nothing has been attempted yet.
    #[default]
    Unknown,
    /// A connection attempt is in progress.
    Connecting,
    /// The socket is open.
    Ok,
    /// The socket closed or failed; a reconnect may be pending.
    Disconnected,
    /// The configured URL is missing or invalid. No attempts are made.
    BadConfig,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionStatus::Unknown => "unknown",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Ok => "ok",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::BadConfig => "bad_config",
        };
        f.write_str(label)
    }
}
