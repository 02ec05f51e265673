//! Persisted config migration.
//!
//! Upgrade steps run in order over the raw stored document. Each step is
//! idempotent and reports whether it changed anything, so running the whole
//! chain over an already-current config is a no-op.

use serde_json::{Map, Value};

use crate::config::TerminationMode;

/// A single upgrade step.
pub type UpgradeStep = fn(&mut Map<String, Value>) -> bool;

/// All upgrade steps, oldest first.
pub const UPGRADE_STEPS: &[(&str, UpgradeStep)] = &[("v2_1", v2_1), ("v2_2", v2_2)];

/// Run every upgrade step. Returns true when any step changed the config.
pub fn upgrade_config(config: &mut Map<String, Value>) -> bool {
    UPGRADE_STEPS
        .iter()
        .fold(false, |changed, (_, step)| step(config) | changed)
}

/// Derive `url` from the legacy `host`/`port` fields and default the
/// termination flag to the legacy `true`.
pub fn v2_1(config: &mut Map<String, Value>) -> bool {
    let mut changed = false;

    if !config.contains_key("url") {
        let host = take_truthy(config, "host")
            .map(|v| display(&v))
            .unwrap_or_else(|| "localhost".to_string());
        let url = match take_truthy(config, "port") {
            Some(port) => format!("ws://{}:{}", host, display(&port)),
            None => format!("ws://{}", host),
        };
        config.insert("url".to_string(), Value::String(url));
        changed = true;
    }

    if !config.contains_key("append_new_line") {
        config.insert("append_new_line".to_string(), Value::Bool(true));
        changed = true;
    }

    changed
}

/// Normalize the legacy boolean termination flag to the enum codes.
pub fn v2_2(config: &mut Map<String, Value>) -> bool {
    if let Some(Value::String(code)) = config.get("append_new_line") {
        if TerminationMode::is_code(code) {
            return false;
        }
    }

    let flag = matches!(config.get("append_new_line"), Some(Value::Bool(true)));
    let code = TerminationMode::from_legacy(flag).code();
    config.insert("append_new_line".to_string(), Value::String(code.to_string()));
    true
}

/// Remove `key` and return its value when it is truthy.
fn take_truthy(config: &mut Map<String, Value>, key: &str) -> Option<Value> {
    if config.get(key).is_some_and(is_truthy) {
        config.remove(key)
    } else {
        None
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_v2_1_derives_url_from_host_and_port() {
        let mut config = map(json!({"host": "192.168.1.10", "port": "8080"}));
        assert!(v2_1(&mut config));
        assert_eq!(
            config,
            map(json!({"url": "ws://192.168.1.10:8080", "append_new_line": true}))
        );
    }

    #[test]
    fn test_v2_1_defaults_host_and_skips_missing_port() {
        let mut config = map(json!({"port": ""}));
        assert!(v2_1(&mut config));
        assert_eq!(config["url"], "ws://localhost");
        // falsy legacy fields are left untouched
        assert_eq!(config["port"], "");
    }

    #[test]
    fn test_v2_1_keeps_existing_fields() {
        let mut config = map(json!({"url": "ws://a", "append_new_line": "n", "host": "b"}));
        assert!(!v2_1(&mut config));
        assert_eq!(config["url"], "ws://a");
        assert_eq!(config["host"], "b");
    }

    #[test]
    fn test_v2_2_normalizes_legacy_flag() {
        let mut config = map(json!({"append_new_line": true}));
        assert!(v2_2(&mut config));
        assert_eq!(config["append_new_line"], "rn");

        let mut config = map(json!({"append_new_line": false}));
        assert!(v2_2(&mut config));
        assert_eq!(config["append_new_line"], "");
    }

    #[test]
    fn test_v2_2_leaves_enum_codes() {
        for code in ["", "rn", "nr", "r", "n"] {
            let mut config = map(json!({"append_new_line": code}));
            assert!(!v2_2(&mut config));
            assert_eq!(config["append_new_line"], code);
        }
    }

    #[test]
    fn test_upgrade_chain_is_idempotent() {
        let mut config = map(json!({"host": "example.com", "port": 81}));
        assert!(upgrade_config(&mut config));
        let upgraded = config.clone();
        assert_eq!(
            upgraded,
            map(json!({"url": "ws://example.com:81", "append_new_line": "rn"}))
        );

        assert!(!upgrade_config(&mut config));
        assert_eq!(config, upgraded);
    }
}
