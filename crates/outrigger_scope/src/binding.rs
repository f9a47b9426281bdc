//! The scope binding table.
//!
//! Maps an add-on to the contexts it is restricted to. An add-on without an
//! entry is unrestricted; an entry always holds at least one target.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Contexts one add-on is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeBinding {
    /// Context identifiers, e.g. character names.
    #[serde(default)]
    pub targets: BTreeSet<String>,
}

impl ScopeBinding {
    /// Whether `context` is one of the targets.
    #[must_use]
    pub fn allows(&self, context: &str) -> bool {
        self.targets.contains(context)
    }
}

/// Add-on identifier to [`ScopeBinding`], persisted as
/// `{ "<addon>": { "targets": [...] } }`.
///
/// Entries with no targets never exist: unbinding the last target removes
/// the entry, and empty entries are dropped when a table is deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, ScopeBinding>",
    into = "BTreeMap<String, ScopeBinding>"
)]
pub struct BindingTable {
    entries: BTreeMap<String, ScopeBinding>,
}

impl From<BTreeMap<String, ScopeBinding>> for BindingTable {
    fn from(mut entries: BTreeMap<String, ScopeBinding>) -> Self {
        entries.retain(|_, binding| !binding.targets.is_empty());
        Self { entries }
    }
}

impl From<BindingTable> for BTreeMap<String, ScopeBinding> {
    fn from(table: BindingTable) -> Self {
        table.entries
    }
}

impl BindingTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts `addon` to `context` as well. Returns whether the table
    /// changed.
    pub fn bind(&mut self, addon: &str, context: &str) -> bool {
        self.entries
            .entry(addon.to_owned())
            .or_default()
            .targets
            .insert(context.to_owned())
    }

    /// Removes `context` from `addon`'s targets, dropping the entry when it
    /// becomes empty. Returns whether the table changed.
    pub fn unbind(&mut self, addon: &str, context: &str) -> bool {
        let Some(binding) = self.entries.get_mut(addon) else {
            return false;
        };
        let removed = binding.targets.remove(context);
        if binding.targets.is_empty() {
            self.entries.remove(addon);
        }
        removed
    }

    /// Drops every binding of `addon`. Returns whether it had any.
    pub fn clear(&mut self, addon: &str) -> bool {
        self.entries.remove(addon).is_some()
    }

    /// The binding of `addon`, if it is restricted.
    #[must_use]
    pub fn get(&self, addon: &str) -> Option<&ScopeBinding> {
        self.entries.get(addon)
    }

    /// Restricted add-ons in identifier order.
    pub fn addons(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScopeBinding)> {
        self.entries
            .iter()
            .map(|(addon, binding)| (addon.as_str(), binding))
    }

    /// Number of restricted add-ons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no add-on is restricted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
