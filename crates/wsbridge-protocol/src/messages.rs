//! Host contract message shapes.
//!
//! The host exposes one action and one feedback type to users:
//! - Action `send_command`: send the `data` option as a text frame
//! - Feedback `websocket_variable`: copy a value selected by `subpath`
//!   from each inbound message into `variable`
//!
//! Options arrive as loosely typed JSON objects. Option values are coerced
//! to strings the way the host's template strings do.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Feedback id for updating a variable from inbound messages.
pub const VARIABLE_FEEDBACK: &str = "websocket_variable";

/// Options of the `send_command` action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOptions {
    /// Command text, possibly containing host variable placeholders.
    #[serde(default, deserialize_with = "coerce_string")]
    pub data: String,
}

/// Options of the `websocket_variable` feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackOptions {
    /// JSON path; blank when the message is not JSON.
    #[serde(default, deserialize_with = "coerce_string")]
    pub subpath: String,
    /// Target variable name.
    #[serde(default, deserialize_with = "coerce_string")]
    pub variable: String,
}

/// A feedback instance as delivered by the host on subscribe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackInstance {
    /// Host-assigned instance id.
    pub id: String,
    /// Feedback type id; defaults to `websocket_variable`.
    #[serde(rename = "type", default = "default_feedback_type")]
    pub feedback_type: String,
    pub options: FeedbackOptions,
}

fn default_feedback_type() -> String {
    VARIABLE_FEEDBACK.to_string()
}

/// Coerce any JSON value to the string a template literal would produce.
fn coerce_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => "null".to_string(),
        other => other.to_string(),
    })
}
