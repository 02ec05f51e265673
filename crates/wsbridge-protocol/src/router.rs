//! Inbound message routing.
//!
//! Every inbound payload is offered to every subscription. Each enabled
//! subscription either receives the whole payload (empty path) or the value
//! found at `prefix + path + suffix`. Absent paths produce no write. The
//! reserved `lastDataReceived` variable is updated for every message.

use wsbridge_core::{
    Payload, PathExpression, PathExtractor, SubscriptionTable, VariableValue, VariableValues,
    LAST_DATA_RECEIVED,
};

/// Routes payloads to variable writes.
pub struct MessageRouter<'a> {
    subscriptions: &'a SubscriptionTable,
    prefix: &'a str,
    suffix: &'a str,
}

impl<'a> MessageRouter<'a> {
    /// Create a router over `subscriptions` using the feedback path affixes.
    pub fn new(subscriptions: &'a SubscriptionTable, prefix: &'a str, suffix: &'a str) -> Self {
        Self {
            subscriptions,
            prefix,
            suffix,
        }
    }

    /// Compute the variable writes for one payload.
    ///
    /// `received_at` is the epoch-millisecond timestamp stored in
    /// `lastDataReceived`; it is always the last entry.
    pub fn route(&self, payload: &Payload, received_at: i64) -> VariableValues {
        let mut values = VariableValues::new();

        for (_, subscription) in self.subscriptions.iter() {
            if subscription.is_disabled() {
                continue;
            }
            let value = if subscription.path.as_str().is_empty() {
                Some(PathExtractor::whole(payload))
            } else {
                let effective = PathExpression::new(&format!(
                    "{}{}{}",
                    self.prefix,
                    subscription.path.as_str(),
                    self.suffix
                ));
                PathExtractor::extract(payload, &effective)
            };
            if let Some(value) = value {
                // later subscriptions for the same variable win
                values.shift_remove(&subscription.variable_name);
                values.insert(subscription.variable_name.clone(), value);
            }
        }

        values.shift_remove(LAST_DATA_RECEIVED);
        values.insert(
            LAST_DATA_RECEIVED.to_string(),
            VariableValue::timestamp(received_at),
        );
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wsbridge_core::Subscription;

    const NOW: i64 = 1_700_000_000_000;

    fn table(entries: &[(&str, &str, &str)]) -> SubscriptionTable {
        let mut table = SubscriptionTable::new();
        for (id, variable, path) in entries {
            table.subscribe((*id).into(), Subscription::new(variable, path));
        }
        table
    }

    #[test]
    fn test_nested_path_writes_value() {
        let table = table(&[("1", "X", "a.b")]);
        let values = MessageRouter::new(&table, "", "")
            .route(&Payload::parse(r#"{"a":{"b":42}}"#), NOW);

        assert_eq!(values.get("X").map(|v| v.to_string()), Some("42".to_string()));
        assert_eq!(values.get(LAST_DATA_RECEIVED), Some(&VariableValue::timestamp(NOW)));
    }

    #[test]
    fn test_absent_path_writes_nothing() {
        let table = table(&[("1", "X", "a.c")]);
        let values = MessageRouter::new(&table, "", "")
            .route(&Payload::parse(r#"{"a":{"b":42}}"#), NOW);

        assert!(!values.contains_key("X"));
        assert_eq!(values.len(), 1);
        assert!(values.contains_key(LAST_DATA_RECEIVED));
    }

    #[test]
    fn test_text_payload_whole_message() {
        let table = table(&[("1", "Y", ""), ("2", "Z", "a")]);
        let values = MessageRouter::new(&table, "", "").route(&Payload::parse("hello"), NOW);

        assert_eq!(values.get("Y"), Some(&VariableValue::from("hello")));
        assert!(!values.contains_key("Z"));
    }

    #[test]
    fn test_whole_json_message_is_stringified() {
        let table = table(&[("1", "raw", "")]);
        let values = MessageRouter::new(&table, "", "")
            .route(&Payload::parse(r#"{"a": [1, 2]}"#), NOW);

        assert_eq!(values.get("raw"), Some(&VariableValue::from(r#"{"a":[1,2]}"#)));
    }

    #[test]
    fn test_disabled_subscription_is_skipped() {
        let table = table(&[("1", "", "")]);
        let values = MessageRouter::new(&table, "", "").route(&Payload::parse("x"), NOW);
        assert_eq!(values.keys().collect::<Vec<_>>(), vec![LAST_DATA_RECEIVED]);
    }

    #[test]
    fn test_prefix_and_suffix_apply_to_non_empty_paths() {
        let table = table(&[("1", "T", "temp"), ("2", "all", "")]);
        let payload = Payload::parse(r#"{"data":{"temp":{"value":21.5}}}"#);
        let values = MessageRouter::new(&table, "data.", ".value").route(&payload, NOW);

        assert_eq!(values.get("T").map(|v| v.to_string()), Some("21.5".to_string()));
        assert_eq!(
            values.get("all"),
            Some(&VariableValue::from(r#"{"data":{"temp":{"value":21.5}}}"#))
        );
    }

    #[test]
    fn test_scalar_json_only_matches_whole_message() {
        let table = table(&[("1", "N", ""), ("2", "M", "a")]);
        let values = MessageRouter::new(&table, "", "").route(&Payload::parse("42"), NOW);

        assert_eq!(values.get("N").map(|v| v.to_string()), Some("42".to_string()));
        assert!(!values.contains_key("M"));
    }

    #[test]
    fn test_slash_only_path_uses_prefix() {
        let table = table(&[("1", "V", "/")]);
        let payload = Payload::parse(r#"{"data":{"x":1}}"#);
        let values = MessageRouter::new(&table, "data", "").route(&payload, NOW);

        // resolves "data/", which addresses the empty key under "data"
        assert!(!values.contains_key("V"));

        let payload = Payload::parse(r#"{"data":{"":"inner"}}"#);
        let values = MessageRouter::new(&table, "data", "").route(&payload, NOW);
        assert_eq!(values.get("V"), Some(&VariableValue::from("inner")));
    }
}
