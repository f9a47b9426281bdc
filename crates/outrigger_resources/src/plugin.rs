//! Server integration.

use crate::descriptor::ResourceDescriptor;
use crate::injector::Injector;
use crate::loader::ResourceLoader;
use crate::persist::DEFAULT_NAMESPACE;
use outrigger_core_plugins::SettingsPlugin;
use outrigger_core_plugins::settings::store_for;
use outrigger_system::plugin::{Plugin, PluginId};
use outrigger_system::server::Server;
use std::sync::Arc;
use std::time::Duration;

/// Installs a [`ResourceLoader`] backed by the server's settings store.
///
/// Startup loading is asynchronous, so the host calls
/// [`ResourceLoader::autoload`] once the server is finished.
///
/// # Example
///
/// ```ignore
/// let mut server = Server::new();
/// server
///     .add_plugins(MinimalPlugins.build())
///     .add_plugins(
///         ResourceLoaderPlugin::new(runtime)
///             .with_load_timeout(Duration::from_secs(10))
///             .with_resource(ResourceDescriptor::new("chartjs", CHART_URL, "Chart")),
///     );
/// server.finish();
///
/// let loader = server.api::<ResourceLoader>().unwrap().clone();
/// let report = loader.autoload().await;
/// ```
pub struct ResourceLoaderPlugin {
    injector: Arc<dyn Injector>,
    namespace: String,
    load_timeout: Option<Duration>,
    builtins: bool,
    resources: Vec<ResourceDescriptor>,
}

impl ResourceLoaderPlugin {
    /// Loads through `injector`.
    #[must_use]
    pub fn new(injector: impl Injector) -> Self {
        Self::with_shared_injector(Arc::new(injector))
    }

    /// Loads through an injector the host keeps a handle to.
    #[must_use]
    pub fn with_shared_injector(injector: Arc<dyn Injector>) -> Self {
        Self {
            injector,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            load_timeout: None,
            builtins: true,
            resources: Vec::new(),
        }
    }

    /// Settings namespace for persisted preferences.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Fails injections that take longer than `timeout`.
    #[must_use]
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Registers an extra resource at build time.
    #[must_use]
    pub fn with_resource(mut self, descriptor: ResourceDescriptor) -> Self {
        self.resources.push(descriptor);
        self
    }

    /// Skips the built-in resource table.
    #[must_use]
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }
}

impl Plugin for ResourceLoaderPlugin {
    fn build(&self, server: &mut Server) {
        let mut builder =
            ResourceLoader::builder(Arc::clone(&self.injector)).namespace(&self.namespace);
        if let Some(store) = store_for(server, "resource loader") {
            builder = builder.settings(store);
        }
        if let Some(timeout) = self.load_timeout {
            builder = builder.load_timeout(timeout);
        }
        if !self.builtins {
            builder = builder.without_builtins();
        }
        for descriptor in &self.resources {
            builder = builder.resource(descriptor.clone());
        }
        server.insert_api(builder.build());
    }

    fn ready(&self, server: &mut Server) {
        if let Some(loader) = server.api::<ResourceLoader>() {
            tracing::info!(
                registered = loader.len(),
                loaded = loader.loaded_names().len(),
                autoload = loader.autoload_names().len(),
                "resource loader installed"
            );
        }
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<SettingsPlugin>()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInjector;
    use outrigger_core_plugins::MinimalPlugins;
    use outrigger_system::plugin::PluginGroup;

    #[test]
    fn installs_loader_with_extra_resources() {
        let mut server = Server::new();
        server.add_plugins(MinimalPlugins.build()).add_plugins(
            ResourceLoaderPlugin::new(MockInjector::new())
                .without_builtins()
                .with_resource(ResourceDescriptor::new("chartjs", "https://x/chart.js", "Chart")),
        );
        server.finish();

        let loader = server.api::<ResourceLoader>().unwrap();
        assert_eq!(loader.len(), 1);
        assert!(loader.is_persistent());
    }

    #[test]
    fn detached_settings_keep_loader_in_memory() {
        let mut server = Server::new();
        server
            .add_plugins(MinimalPlugins.build().set(SettingsPlugin::detached()))
            .add_plugins(ResourceLoaderPlugin::new(MockInjector::new()));
        server.finish();

        let loader = server.api::<ResourceLoader>().unwrap();
        assert!(!loader.is_persistent());
        assert!(loader.descriptor("axios").is_some());
    }

    #[test]
    #[should_panic(expected = "requires")]
    fn requires_settings_plugin() {
        let mut server = Server::new();
        server.add_plugins(ResourceLoaderPlugin::new(MockInjector::new()));
        server.finish();
    }
}
