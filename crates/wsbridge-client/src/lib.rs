//! # wsbridge-client
//!
//! Tokio-based WebSocket client that feeds inbound messages into host
//! variables.
//!
//! The [`ConnectionSupervisor`] owns one connection at a time and handles
//! reconnects and heartbeat supervision. It is driven through a cloneable
//! [`SupervisorHandle`] and writes everything it computes through a
//! [`wsbridge_core::Host`].
//!
//! ```ignore
//! let (handle, task) = ConnectionSupervisor::new(host, SupervisorOptions::default()).spawn();
//! handle.configure(EndpointConfig::with_url("ws://localhost:8080")).await?;
//! handle.subscribe("fb1", "temperature", "sensors.temp").await?;
//! handle.send_command("status").await?;
//! ```

pub mod connection;
pub mod error;
pub mod host;
pub mod supervisor;
pub mod timer;

pub use connection::{SocketEvent, ABNORMAL_CLOSURE, NORMAL_CLOSURE, NO_STATUS_RECEIVED};
pub use error::{ClientError, SendError};
pub use host::{ChannelHost, HostEvent};
pub use supervisor::{ConnectionSupervisor, SupervisorHandle, SupervisorOptions, RECONNECT_DELAY};
pub use timer::{TimerId, TimerSlot};
