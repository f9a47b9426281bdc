//! Server integration.

use crate::api::ScopeAPI;
use crate::resolver::ResolverModel;
use outrigger_core_plugins::settings::store_for;
use outrigger_core_plugins::{ContextAPI, ContextPlugin, SettingsPlugin};
use outrigger_system::plugin::{Plugin, PluginId};
use outrigger_system::server::Server;

/// Installs the [`ScopeAPI`], restored from the server's settings store and
/// wired to its [`ContextAPI`].
#[derive(Debug, Clone)]
pub struct ScopePlugin {
    namespace: String,
    model: ResolverModel,
}

impl Default for ScopePlugin {
    fn default() -> Self {
        Self {
            namespace: "outrigger".to_owned(),
            model: ResolverModel::default(),
        }
    }
}

impl ScopePlugin {
    /// Two-tier resolution in the default namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings namespace for the persisted table.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Selects the precedence rules.
    #[must_use]
    pub fn with_model(mut self, model: ResolverModel) -> Self {
        self.model = model;
        self
    }
}

impl Plugin for ScopePlugin {
    fn build(&self, server: &mut Server) {
        let Some(context) = server.api::<ContextAPI>().cloned() else {
            panic!("ScopePlugin requires ContextAPI. Add ContextPlugin first.");
        };
        let store = store_for(server, "scope");
        server.insert_api(ScopeAPI::restore(
            context,
            store,
            self.namespace.clone(),
            self.model,
        ));
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![
            PluginId::of::<SettingsPlugin>(),
            PluginId::of::<ContextPlugin>(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outrigger_core_plugins::MinimalPlugins;
    use outrigger_system::plugin::PluginGroup;

    #[test]
    fn installs_scope_api() {
        let mut server = Server::new();
        server
            .add_plugins(ScopePlugin::new().with_model(ResolverModel::GlobalOverride))
            .add_plugins(MinimalPlugins.build());
        server.finish();

        let scope = server.api::<ScopeAPI>().unwrap();
        assert_eq!(scope.model(), ResolverModel::GlobalOverride);
    }

    #[test]
    fn shares_the_server_context() {
        let mut server = Server::new();
        server
            .add_plugins(MinimalPlugins.build())
            .add_plugins(ScopePlugin::new());
        server.finish();

        let scope = server.api::<ScopeAPI>().unwrap();
        scope.bind_to_context("ext1", "Alice");
        server
            .api::<ContextAPI>()
            .unwrap()
            .set_current(Some("Alice"));
        assert!(scope.is_active_now("ext1"));
    }
}
