//! # wsbridge-protocol
//!
//! Wire-facing pieces of the WebSocket bridge.
//!
//! This crate defines inbound frame decoding, routing of decoded payloads to
//! variable writes, outbound command formatting and the host option shapes.

pub mod codec;
pub mod messages;
pub mod outbound;
pub mod router;

pub use codec::{decode_frame, CodecError, InboundFrame};
pub use messages::*;
pub use outbound::format_command;
pub use router::MessageRouter;
