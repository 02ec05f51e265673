//! Channel-backed host.

use tokio::sync::mpsc;

use wsbridge_core::{ConnectionStatus, Host, VariableDefinition, VariableValues};

/// A host call, as forwarded by [`ChannelHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Status {
        status: ConnectionStatus,
        message: Option<String>,
    },
    Definitions(Vec<VariableDefinition>),
    Values(VariableValues),
}

/// Host that forwards every call to a channel.
///
/// Useful when the embedding side lives on another task.
#[derive(Debug, Clone)]
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl ChannelHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Host for ChannelHost {
    fn update_status(&mut self, status: ConnectionStatus, message: Option<&str>) {
        let _ = self.tx.send(HostEvent::Status {
            status,
            message: message.map(str::to_string),
        });
    }

    fn set_variable_definitions(&mut self, definitions: &[VariableDefinition]) {
        let _ = self.tx.send(HostEvent::Definitions(definitions.to_vec()));
    }

    fn set_variable_values(&mut self, values: &VariableValues) {
        let _ = self.tx.send(HostEvent::Values(values.clone()));
    }
}
