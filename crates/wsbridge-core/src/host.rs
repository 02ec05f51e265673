//! Host collaborator interface.
//!
//! The bridge never owns variables or status display. Everything it computes
//! is written through a [`Host`], which is implemented by whatever embeds the
//! bridge (an automation platform adapter, a CLI, a test recorder).

use crate::model::{VariableDefinition, VariableValues};
use crate::status::ConnectionStatus;

/// Sink for status and variable updates.
///
/// All methods are synchronous and called from the supervisor's event loop,
/// one at a time.
pub trait Host: Send + 'static {
    /// Report the connection status, with an optional detail message.
    fn update_status(&mut self, status: ConnectionStatus, message: Option<&str>);

    /// Replace the full set of variable definitions.
    fn set_variable_definitions(&mut self, definitions: &[VariableDefinition]);

    /// Write a batch of variable values.
    fn set_variable_values(&mut self, values: &VariableValues);
}
