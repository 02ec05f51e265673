//! Frame and option decoding.
//!
//! Inbound WebSocket frames are reduced to text (binary frames are decoded
//! as UTF-8) and then parsed as JSON on a best-effort basis. Host option
//! objects are decoded into the typed shapes in [`crate::messages`].

use serde_json::Value;
use thiserror::Error;
use wsbridge_core::Payload;

use crate::messages::{ActionOptions, FeedbackInstance, FeedbackOptions};

/// Errors that can occur while decoding host options.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON deserialization failed.
    #[error("Failed to decode options: {0}")]
    Options(#[from] serde_json::Error),
}

/// A data frame received from the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl InboundFrame {
    /// The frame content as text. Invalid UTF-8 is replaced.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            InboundFrame::Text(text) => std::borrow::Cow::Borrowed(text),
            InboundFrame::Binary(data) => String::from_utf8_lossy(data),
        }
    }
}

impl std::fmt::Display for InboundFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}

/// Decode a frame into a payload.
pub fn decode_frame(frame: &InboundFrame) -> Payload {
    Payload::parse(&frame.text())
}

/// Decode `send_command` options.
pub fn decode_action_options(options: Value) -> Result<ActionOptions, CodecError> {
    serde_json::from_value(options).map_err(CodecError::from)
}

/// Decode `websocket_variable` options.
pub fn decode_feedback_options(options: Value) -> Result<FeedbackOptions, CodecError> {
    serde_json::from_value(options).map_err(CodecError::from)
}

/// Decode a list of feedback instances.
pub fn decode_feedbacks(feedbacks: Value) -> Result<Vec<FeedbackInstance>, CodecError> {
    serde_json::from_value(feedbacks).map_err(CodecError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_text_frame() {
        let payload = decode_frame(&InboundFrame::Text(r#"{"a":{"b":42}}"#.to_string()));
        assert_eq!(payload, Payload::Json(json!({"a": {"b": 42}})));

        let payload = decode_frame(&InboundFrame::Text("hello".to_string()));
        assert_eq!(payload, Payload::Text("hello".to_string()));
    }

    #[test]
    fn test_decode_binary_frame() {
        let payload = decode_frame(&InboundFrame::Binary(br#"[1,2,3]"#.to_vec()));
        assert_eq!(payload, Payload::Json(json!([1, 2, 3])));

        let payload = decode_frame(&InboundFrame::Binary(vec![0x68, 0x69, 0xff]));
        assert_eq!(payload, Payload::Text("hi\u{fffd}".to_string()));
    }

    #[test]
    fn test_decode_feedback_options() {
        let options = decode_feedback_options(json!({"subpath": "a.b", "variable": "X"})).unwrap();
        assert_eq!(options.subpath, "a.b");
        assert_eq!(options.variable, "X");

        let options = decode_feedback_options(json!({"variable": 7})).unwrap();
        assert_eq!(options.subpath, "");
        assert_eq!(options.variable, "7");
    }

    #[test]
    fn test_decode_feedbacks() {
        let feedbacks = decode_feedbacks(json!([
            {"id": "fb1", "options": {"subpath": "", "variable": "raw"}},
            {"id": "fb2", "type": "websocket_variable", "options": {"subpath": "a", "variable": "A"}}
        ]))
        .unwrap();
        assert_eq!(feedbacks.len(), 2);
        assert_eq!(feedbacks[0].feedback_type, "websocket_variable");
        assert_eq!(feedbacks[1].options.subpath, "a");
    }

    #[test]
    fn test_decode_action_options() {
        let options = decode_action_options(json!({"data": "ping"})).unwrap();
        assert_eq!(options.data, "ping");
        assert!(decode_action_options(json!("nope")).is_err());
    }
}
