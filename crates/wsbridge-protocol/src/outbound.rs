//! Outbound command formatting.

use wsbridge_core::TerminationMode;

/// Append the configured termination to a command.
///
/// Placeholders in `command` are expected to be resolved by the host
/// before this is called.
pub fn format_command(command: &str, termination: TerminationMode) -> String {
    let suffix = termination.suffix();
    let mut framed = String::with_capacity(command.len() + suffix.len());
    framed.push_str(command);
    framed.push_str(suffix);
    framed
}
