//! Variable projection.
//!
//! Derives the host variable definitions from the subscription table and,
//! when resets are enabled, the empty default values to push alongside them.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::model::{SubscriptionId, VariableDefinition, VariableValue, VariableValues};
use crate::subscription::SubscriptionTable;

static VARIABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

/// Check a variable name against the host identifier rules.
pub fn is_valid_variable_name(name: &str) -> bool {
    VARIABLE_NAME.is_match(name)
}

/// Result of a projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    /// Reserved timestamp variable first, then every distinct valid name.
    pub definitions: Vec<VariableDefinition>,
    /// Empty defaults to push. Always empty when resets are disabled.
    pub defaults: VariableValues,
}

/// Computes variable definitions and reset defaults.
#[derive(Debug, Clone, Copy)]
pub struct VariableProjector {
    reset: bool,
}

impl VariableProjector {
    /// `reset` enables computation of empty default values.
    pub fn new(reset: bool) -> Self {
        Self { reset }
    }

    /// Project the table into variable definitions.
    ///
    /// Names failing the identifier rules stay in the table but are left out
    /// here. With `caller` unset every variable is reset (full resync);
    /// with `caller` set only the variable owned by that subscription is.
    pub fn project(
        &self,
        table: &SubscriptionTable,
        caller: Option<&SubscriptionId>,
    ) -> Projection {
        let mut names = IndexSet::new();
        let mut defaults = VariableValues::new();

        for (id, subscription) in table.iter() {
            if !is_valid_variable_name(&subscription.variable_name) {
                continue;
            }
            names.insert(subscription.variable_name.as_str());
            if self.reset && caller.map_or(true, |caller| caller == id) {
                defaults.insert(subscription.variable_name.clone(), VariableValue::empty());
            }
        }

        let mut definitions = Vec::with_capacity(names.len() + 1);
        definitions.push(VariableDefinition::last_data_received());
        definitions.extend(names.into_iter().map(|name| VariableDefinition::new(name, name)));

        Projection {
            definitions,
            defaults,
        }
    }
}
