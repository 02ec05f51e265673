//! Path expressions over JSON payloads.
//!
//! A path expression is a string like "a.b.0.c" or "a/b/0/c" selecting a
//! nested field. Segments are separated by '.' or '/'; a segment addresses an
//! object key, or an array index when the current value is an array.
//!
//! Resolution uses plain segment walking instead of a JSONPath engine. A
//! missing segment means the path is absent, which callers treat as "no
//! value" rather than as an error.

use serde_json::Value;

use crate::model::{Payload, VariableValue};

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    /// The original expression string
    raw: String,
    /// Expression segments split by '.' or '/'
    segments: Vec<String>,
}

impl PathExpression {
    /// Parse an expression string into segments.
    ///
    /// A single leading '/' is ignored so "/a/b" and "a/b" are equivalent.
    /// Only the empty expression has no segments; "/" addresses the empty key.
    pub fn new(expression: &str) -> Self {
        let trimmed = expression.strip_prefix('/').unwrap_or(expression);
        let segments = if expression.is_empty() {
            Vec::new()
        } else {
            trimmed.split(['.', '/']).map(String::from).collect()
        };
        Self {
            raw: expression.to_string(),
            segments,
        }
    }

    /// Get the raw expression string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Get the expression segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True when the expression selects the whole value.
    pub fn is_root(&self) -> bool {
        self.raw.is_empty()
    }

    /// Resolve this expression against a JSON value.
    ///
    /// Returns `None` when any segment is absent. A present `null` resolves
    /// to `Some(&Value::Null)`.
    pub fn resolve<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        let mut current = value;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment.as_str())?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl std::fmt::Display for PathExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for PathExpression {
    fn from(s: &str) -> Self {
        PathExpression::new(s)
    }
}

impl From<String> for PathExpression {
    fn from(s: String) -> Self {
        PathExpression::new(&s)
    }
}

/// Extracts variable values from inbound payloads.
pub struct PathExtractor;

impl PathExtractor {
    /// The whole payload as a variable value.
    pub fn whole(payload: &Payload) -> VariableValue {
        VariableValue::from_payload(payload)
    }

    /// Resolve `expression` against the payload.
    ///
    /// Only JSON objects and arrays are walked; text and scalar payloads never
    /// match a non-empty expression. An empty expression returns the whole
    /// payload.
    pub fn extract(payload: &Payload, expression: &PathExpression) -> Option<VariableValue> {
        if expression.is_root() {
            return Some(Self::whole(payload));
        }
        let container = payload.container()?;
        expression.resolve(container).map(VariableValue::from_json)
    }
}
