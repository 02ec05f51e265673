//! Reference host: keeps variables in memory and logs every update.

use std::sync::{Arc, LazyLock, RwLock};

use indexmap::IndexMap;
use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use wsbridge_core::{ConnectionStatus, Host, VariableDefinition, VariableValue, VariableValues};

/// Placeholder for a variable reference: `$(<instance>:<variable>)`.
static VARIABLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\(([^:$)]+):([^)$]+)\)").unwrap());

/// Text substituted for references that cannot be resolved.
const UNRESOLVED: &str = "$NA";

/// Variables defined for one instance.
#[derive(Debug, Default)]
pub struct VariableStore {
    definitions: Vec<VariableDefinition>,
    values: IndexMap<String, VariableValue>,
}

impl VariableStore {
    pub fn get(&self, variable: &str) -> Option<&VariableValue> {
        self.values.get(variable)
    }

    pub fn is_defined(&self, variable: &str) -> bool {
        self.definitions.iter().any(|d| d.variable_id == variable)
    }
}

pub type SharedStore = Arc<RwLock<VariableStore>>;

/// Host implementation writing into a [`SharedStore`].
pub struct LoggingHost {
    label: String,
    store: SharedStore,
}

impl LoggingHost {
    pub fn new(label: &str) -> (Self, SharedStore) {
        let store = SharedStore::default();
        (
            Self {
                label: label.to_string(),
                store: store.clone(),
            },
            store,
        )
    }
}

impl Host for LoggingHost {
    fn update_status(&mut self, status: ConnectionStatus, message: Option<&str>) {
        match message {
            Some(message) => info!("[{}] status {}: {}", self.label, status, message),
            None => info!("[{}] status {}", self.label, status),
        }
    }

    fn set_variable_definitions(&mut self, definitions: &[VariableDefinition]) {
        let ids: Vec<&str> = definitions.iter().map(|d| d.variable_id.as_str()).collect();
        debug!("[{}] variables: {}", self.label, ids.join(", "));

        if let Ok(mut store) = self.store.write() {
            store.definitions = definitions.to_vec();
        }
    }

    fn set_variable_values(&mut self, values: &VariableValues) {
        let Ok(mut store) = self.store.write() else {
            warn!("Variable store is poisoned");
            return;
        };
        for (name, value) in values {
            info!("$({}:{}) = {}", self.label, name, value);
            store.values.insert(name.clone(), value.clone());
        }
    }
}

/// Replace `$(<label>:<variable>)` references with current values.
///
/// References to other instances or to unknown variables become `$NA`.
pub fn interpolate(text: &str, label: &str, store: &VariableStore) -> String {
    VARIABLE_REF
        .replace_all(text, |caps: &Captures| {
            if &caps[1] != label {
                return UNRESOLVED.to_string();
            }
            store
                .get(&caps[2])
                .map_or_else(|| UNRESOLVED.to_string(), ToString::to_string)
        })
        .into_owned()
}
