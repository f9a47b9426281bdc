//! Scope state shared with the rest of the integration.

use crate::binding::{BindingTable, ScopeBinding};
use crate::resolver::{Decision, ResolverModel, resolve};
use outrigger_core_plugins::ContextAPI;
use outrigger_core_plugins::settings::{SettingsStore, SettingsStoreExt};
use outrigger_system::api::API;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Key holding the binding table.
pub const BINDINGS_KEY: &str = "scopeBindings";

/// Key holding globally enabled add-ons.
pub const GLOBALLY_ENABLED_KEY: &str = "globallyEnabled";

#[derive(Default)]
struct ScopeState {
    bindings: BindingTable,
    globally_enabled: BTreeSet<String>,
}

struct ScopeInner {
    state: RwLock<ScopeState>,
    model: ResolverModel,
    store: Option<Arc<dyn SettingsStore>>,
    namespace: String,
    context: ContextAPI,
}

/// Binding table, global-enable set and resolver behind one handle.
///
/// Every change that alters state is persisted, schedules a save and asks
/// [`ContextAPI`] subscribers to re-evaluate. Changes that alter nothing do
/// none of that.
///
/// # Example
///
/// ```
/// use outrigger_core_plugins::ContextAPI;
/// use outrigger_scope::ScopeAPI;
///
/// let context = ContextAPI::new();
/// let scope = ScopeAPI::in_memory(context.clone());
///
/// scope.bind_to_context("ext1", "Alice");
/// assert!(scope.is_active("ext1", Some("Alice")));
/// assert!(!scope.is_active("ext1", Some("Bob")));
/// assert!(scope.is_active("ext2", None));
///
/// context.set_current(Some("Alice"));
/// assert!(scope.is_active_now("ext1"));
/// ```
#[derive(Clone)]
pub struct ScopeAPI {
    inner: Arc<ScopeInner>,
}

impl API for ScopeAPI {}

impl core::fmt::Debug for ScopeAPI {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("ScopeAPI")
            .field("model", &self.inner.model)
            .field("bound", &state.bindings.len())
            .field("globally_enabled", &state.globally_enabled.len())
            .field("persistent", &self.inner.store.is_some())
            .finish()
    }
}

impl ScopeAPI {
    /// Restores scope state from `store` (or starts empty without one).
    #[must_use]
    pub fn restore(
        context: ContextAPI,
        store: Option<Arc<dyn SettingsStore>>,
        namespace: impl Into<String>,
        model: ResolverModel,
    ) -> Self {
        let namespace = namespace.into();
        let state = match &store {
            Some(store) => ScopeState {
                bindings: store.get_or(&namespace, BINDINGS_KEY, BindingTable::new()),
                globally_enabled: store.get_or(&namespace, GLOBALLY_ENABLED_KEY, BTreeSet::new()),
            },
            None => ScopeState::default(),
        };
        tracing::debug!(
            %namespace,
            ?model,
            bound = state.bindings.len(),
            globally_enabled = state.globally_enabled.len(),
            "scope state restored"
        );
        Self {
            inner: Arc::new(ScopeInner {
                state: RwLock::new(state),
                model,
                store,
                namespace,
                context,
            }),
        }
    }

    /// Empty, unpersisted state using the two-tier model.
    #[must_use]
    pub fn in_memory(context: ContextAPI) -> Self {
        Self::restore(context, None, "outrigger", ResolverModel::TwoTier)
    }

    /// The precedence rules in use.
    #[must_use]
    pub fn model(&self) -> ResolverModel {
        self.inner.model
    }

    /// Restricts `addon` to `context` (in addition to existing targets).
    pub fn bind_to_context(&self, addon: &str, context: &str) -> bool {
        let changed = self.update(|state| state.bindings.bind(addon, context));
        if changed {
            tracing::info!(addon, context, "add-on bound to context");
        }
        changed
    }

    /// Lifts the restriction of `addon` to `context`. Removing the last
    /// target makes the add-on unrestricted again.
    pub fn unbind_from_context(&self, addon: &str, context: &str) -> bool {
        let changed = self.update(|state| state.bindings.unbind(addon, context));
        if changed {
            tracing::info!(addon, context, "add-on unbound from context");
        }
        changed
    }

    /// Removes every restriction of `addon`.
    pub fn clear_bindings(&self, addon: &str) -> bool {
        let changed = self.update(|state| state.bindings.clear(addon));
        if changed {
            tracing::info!(addon, "add-on bindings cleared");
        }
        changed
    }

    /// Marks `addon` as globally enabled. Only affects decisions under
    /// [`ResolverModel::GlobalOverride`].
    pub fn enable_globally(&self, addon: &str) -> bool {
        let changed = self.update(|state| state.globally_enabled.insert(addon.to_owned()));
        if changed {
            tracing::info!(addon, "add-on globally enabled");
        }
        changed
    }

    /// Clears the global-enable flag of `addon`.
    pub fn disable_globally(&self, addon: &str) -> bool {
        let changed = self.update(|state| state.globally_enabled.remove(addon));
        if changed {
            tracing::info!(addon, "add-on globally disabled");
        }
        changed
    }

    /// Whether `addon` carries the global-enable flag.
    #[must_use]
    pub fn is_globally_enabled(&self, addon: &str) -> bool {
        self.inner.state.read().globally_enabled.contains(addon)
    }

    /// Explains whether `addon` is active in `context`.
    #[must_use]
    pub fn decide(&self, addon: &str, context: Option<&str>) -> Decision {
        let state = self.inner.state.read();
        let decision = resolve(
            self.inner.model,
            state.globally_enabled.contains(addon),
            state.bindings.get(addon),
            context,
        );
        tracing::trace!(addon, context, ?decision, "scope decision");
        decision
    }

    /// Whether `addon` is active in `context`.
    #[must_use]
    pub fn is_active(&self, addon: &str, context: Option<&str>) -> bool {
        self.decide(addon, context).is_active()
    }

    /// Whether `addon` is active in the host's current context.
    #[must_use]
    pub fn is_active_now(&self, addon: &str) -> bool {
        let current = self.inner.context.current();
        self.is_active(addon, current.as_deref())
    }

    /// The binding of `addon`, if it is restricted.
    #[must_use]
    pub fn bindings(&self, addon: &str) -> Option<ScopeBinding> {
        self.inner.state.read().bindings.get(addon).cloned()
    }

    /// Snapshot of the whole binding table.
    #[must_use]
    pub fn all_bindings(&self) -> BindingTable {
        self.inner.state.read().bindings.clone()
    }

    /// Add-ons that are bound or globally enabled, sorted.
    #[must_use]
    pub fn known_addons(&self) -> Vec<String> {
        let state = self.inner.state.read();
        state
            .bindings
            .addons()
            .map(str::to_owned)
            .chain(state.globally_enabled.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Applies `change` and, if it altered anything, persists and notifies.
    fn update(&self, change: impl FnOnce(&mut ScopeState) -> bool) -> bool {
        {
            let mut state = self.inner.state.write();
            if !change(&mut *state) {
                return false;
            }
            // Written under the lock so concurrent edits persist in order.
            self.persist(&*state);
        }
        self.inner.context.reload();
        true
    }

    fn persist(&self, state: &ScopeState) {
        let Some(store) = &self.inner.store else {
            tracing::debug!("no settings store, scope change kept in memory");
            return;
        };
        let namespace = &self.inner.namespace;
        let written = store
            .set_typed(namespace, BINDINGS_KEY, &state.bindings)
            .and_then(|()| store.set_typed(namespace, GLOBALLY_ENABLED_KEY, &state.globally_enabled));
        match written {
            Ok(()) => store.schedule_save(),
            Err(err) => tracing::warn!(error = %err, "failed to persist scope state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outrigger_core_plugins::ContextEvent;
    use outrigger_core_plugins::settings::SettingsDocument;

    fn persistent(doc: &SettingsDocument, model: ResolverModel) -> ScopeAPI {
        ScopeAPI::restore(
            ContextAPI::new(),
            Some(Arc::new(doc.clone())),
            "outrigger",
            model,
        )
    }

    #[test]
    fn bind_and_unbind_scenario() {
        let scope = ScopeAPI::in_memory(ContextAPI::new());

        scope.bind_to_context("ext1", "Alice");
        assert!(scope.is_active("ext1", Some("Alice")));
        assert!(!scope.is_active("ext1", Some("Bob")));
        assert!(!scope.is_active("ext1", None));
        assert!(scope.is_active("ext2", Some("Bob")));

        scope.unbind_from_context("ext1", "Alice");
        assert!(scope.bindings("ext1").is_none());
        assert!(scope.is_active("ext1", Some("Alice")));
        assert!(scope.is_active("ext1", None));
    }

    #[test]
    fn decisions_explain_themselves() {
        let scope = ScopeAPI::in_memory(ContextAPI::new());
        scope.bind_to_context("ext1", "Alice");

        assert_eq!(scope.decide("ext1", Some("Alice")), Decision::Matched);
        assert_eq!(scope.decide("ext1", Some("Bob")), Decision::NotMatched);
        assert_eq!(scope.decide("ext1", None), Decision::NoContext);
        assert_eq!(scope.decide("ext2", None), Decision::Unrestricted);
    }

    #[test]
    fn global_flag_only_counts_under_override_model() {
        let doc = SettingsDocument::in_memory();

        let two_tier = persistent(&doc, ResolverModel::TwoTier);
        two_tier.bind_to_context("ext1", "Alice");
        two_tier.enable_globally("ext1");
        assert!(two_tier.is_globally_enabled("ext1"));
        assert!(!two_tier.is_active("ext1", Some("Bob")));

        let overriding = persistent(&doc, ResolverModel::GlobalOverride);
        assert_eq!(overriding.decide("ext1", Some("Bob")), Decision::Overridden);

        overriding.disable_globally("ext1");
        assert!(!overriding.is_active("ext1", Some("Bob")));
    }

    #[test]
    fn changes_are_written_to_the_store() {
        let doc = SettingsDocument::in_memory();
        let scope = persistent(&doc, ResolverModel::TwoTier);

        scope.bind_to_context("ext1", "Alice");
        scope.enable_globally("ext2");

        let bindings: BindingTable = doc.get_or("outrigger", BINDINGS_KEY, BindingTable::new());
        assert!(bindings.get("ext1").unwrap().allows("Alice"));
        let enabled: Vec<String> = doc.get_or("outrigger", GLOBALLY_ENABLED_KEY, Vec::new());
        assert_eq!(enabled, vec!["ext2"]);

        let restored = persistent(&doc, ResolverModel::TwoTier);
        assert_eq!(restored.all_bindings(), scope.all_bindings());
        assert_eq!(restored.known_addons(), vec!["ext1", "ext2"]);
    }

    #[test]
    fn only_real_changes_notify() {
        let context = ContextAPI::new();
        let mut events = context.subscribe();
        let scope = ScopeAPI::in_memory(context);

        assert!(scope.bind_to_context("ext1", "Alice"));
        assert!(!scope.bind_to_context("ext1", "Alice"));
        assert!(!scope.unbind_from_context("ext1", "Bob"));
        assert!(scope.clear_bindings("ext1"));
        assert!(!scope.clear_bindings("ext1"));

        assert_eq!(events.try_recv(), Ok(ContextEvent::Reloaded { current: None }));
        assert_eq!(events.try_recv(), Ok(ContextEvent::Reloaded { current: None }));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn active_now_follows_the_context() {
        let context = ContextAPI::new();
        let scope = ScopeAPI::in_memory(context.clone());
        scope.bind_to_context("ext1", "Alice");

        assert!(!scope.is_active_now("ext1"));
        context.set_current(Some("Alice"));
        assert!(scope.is_active_now("ext1"));
        context.set_current(Some("Bob"));
        assert!(!scope.is_active_now("ext1"));
    }
}
