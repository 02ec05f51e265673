//! Bridge data model types.
//!
//! These types are shared by every layer of the bridge:
//! - Inbound payloads (raw text or parsed JSON)
//! - Variable values and definitions handed to the host
//! - Subscription identifiers assigned by the host feedback system

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Reserved variable holding the epoch-millisecond timestamp of the last
/// inbound frame.
pub const LAST_DATA_RECEIVED: &str = "lastDataReceived";

/// Display name of the reserved timestamp variable.
pub const LAST_DATA_RECEIVED_NAME: &str = "Timestamp when last data was received";

/// Opaque subscription identifier assigned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        SubscriptionId::new(s)
    }
}

impl From<String> for SubscriptionId {
    fn from(s: String) -> Self {
        SubscriptionId(s)
    }
}

/// An inbound message after decoding.
///
/// Frames that parse as JSON become `Json`, everything else is kept as the
/// original text.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    /// Parse text as JSON, falling back to the raw text.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(text.to_string()),
        }
    }

    /// The JSON container (object or array) if this payload has one.
    pub fn container(&self) -> Option<&Value> {
        match self {
            Payload::Json(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
            _ => None,
        }
    }
}

/// A value written to a host variable.
///
/// Objects, arrays and `null` are stored as their JSON text; strings,
/// numbers and booleans are stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    String(String),
    Number(Number),
    Bool(bool),
}

impl VariableValue {
    /// Convert a JSON value into the form stored in a variable.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => VariableValue::String(s.clone()),
            Value::Number(n) => VariableValue::Number(integral(n)),
            Value::Bool(b) => VariableValue::Bool(*b),
            Value::Null => VariableValue::String("null".to_string()),
            Value::Object(_) | Value::Array(_) => {
                VariableValue::String(normalized(value).to_string())
            }
        }
    }

    /// Convert a whole payload into a variable value.
    pub fn from_payload(payload: &Payload) -> Self {
        match payload {
            Payload::Text(text) => VariableValue::String(text.clone()),
            Payload::Json(value) => VariableValue::from_json(value),
        }
    }

    /// The empty-string value used when resetting variables.
    pub fn empty() -> Self {
        VariableValue::String(String::new())
    }

    /// Epoch-millisecond timestamp value.
    pub fn timestamp(epoch_millis: i64) -> Self {
        VariableValue::Number(Number::from(epoch_millis))
    }
}

/// Largest integer a double represents exactly (2^53).
const MAX_SAFE_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Integral floats become integers, so `1.0` is written as `1`.
fn integral(n: &Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_SAFE_FLOAT => {
            Number::from(f as i64)
        }
        _ => n.clone(),
    }
}

fn normalized(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(integral(n)),
        Value::Array(items) => Value::Array(items.iter().map(normalized).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalized(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

impl std::fmt::Display for VariableValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableValue::String(s) => f.write_str(s),
            VariableValue::Number(n) => write!(f, "{}", n),
            VariableValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        VariableValue::String(s.to_string())
    }
}

/// Ordered batch of variable writes. Later writes to the same name win.
pub type VariableValues = IndexMap<String, VariableValue>;

/// A variable definition pushed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    /// Human readable name.
    pub name: String,
    /// Identifier used in variable references.
    pub variable_id: String,
}

impl VariableDefinition {
    pub fn new(name: &str, variable_id: &str) -> Self {
        Self {
            name: name.to_string(),
            variable_id: variable_id.to_string(),
        }
    }

    /// Definition of the reserved timestamp variable.
    pub fn last_data_received() -> Self {
        Self::new(LAST_DATA_RECEIVED_NAME, LAST_DATA_RECEIVED)
    }
}
