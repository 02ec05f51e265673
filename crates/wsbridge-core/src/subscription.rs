//! Subscription table.
//!
//! Maps host-assigned subscription ids to the variable they feed and the
//! path expression selecting the value. The table is the single source of
//! truth for which variables exist.

use indexmap::IndexMap;

use crate::model::SubscriptionId;
use crate::path::PathExpression;

/// A binding from inbound messages to one host variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    /// Target variable name. Empty disables the subscription.
    pub variable_name: String,
    /// Path expression; empty selects the whole message.
    pub path: PathExpression,
}

impl Subscription {
    /// Create a new subscription.
    pub fn new(variable_name: &str, path: &str) -> Self {
        Self {
            variable_name: variable_name.to_string(),
            path: PathExpression::new(path),
        }
    }

    /// Disabled subscriptions never write.
    pub fn is_disabled(&self) -> bool {
        self.variable_name.is_empty()
    }
}

/// Subscriptions keyed by id, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionTable {
    entries: IndexMap<SubscriptionId, Subscription>,
}

impl SubscriptionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the subscription for `id`.
    ///
    /// Returns the previous subscription if one was replaced.
    pub fn subscribe(
        &mut self,
        id: SubscriptionId,
        subscription: Subscription,
    ) -> Option<Subscription> {
        self.entries.insert(id, subscription)
    }

    /// Remove the subscription for `id`.
    pub fn unsubscribe(&mut self, id: &SubscriptionId) -> Option<Subscription> {
        self.entries.shift_remove(id)
    }

    pub fn get(&self, id: &SubscriptionId) -> Option<&Subscription> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &SubscriptionId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate all subscriptions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&SubscriptionId, &Subscription)> {
        self.entries.iter()
    }
}
