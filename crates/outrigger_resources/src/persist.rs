//! Persisted loader preferences.
//!
//! Two keys live in the loader's settings namespace:
//!
//! | key | shape |
//! |-----|-------|
//! | `autoloadResourceNames` | array of resource names |
//! | `customResources` | array of `{ name, source, exposedHandle, description? }` |
//!
//! Without a settings store both are kept in memory only.

use crate::descriptor::{ResourceDescriptor, ResourceSource};
use outrigger_core_plugins::settings::{SettingsStore, SettingsStoreExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Settings namespace used unless the host configures another.
pub const DEFAULT_NAMESPACE: &str = "outrigger";

/// Key holding the names of resources to load at startup.
pub const AUTOLOAD_KEY: &str = "autoloadResourceNames";

/// Key holding user-registered resources.
pub const CUSTOM_RESOURCES_KEY: &str = "customResources";

/// A user-registered resource as it is stored in settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomResource {
    /// Unique registry key.
    pub name: String,
    /// URL or sentinel.
    pub source: ResourceSource,
    /// Runtime name the resource is exposed under.
    pub exposed_handle: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CustomResource {
    pub(crate) fn to_descriptor(&self) -> ResourceDescriptor {
        let descriptor =
            ResourceDescriptor::new(&self.name, self.source.clone(), &self.exposed_handle);
        match &self.description {
            Some(description) => descriptor.with_description(description),
            None => descriptor,
        }
    }
}

pub(crate) struct LoaderSettings {
    store: Option<Arc<dyn SettingsStore>>,
    namespace: String,
}

impl LoaderSettings {
    pub(crate) fn new(store: Option<Arc<dyn SettingsStore>>, namespace: String) -> Self {
        Self { store, namespace }
    }

    pub(crate) fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    pub(crate) fn namespace(&self) -> &str {
        &self.namespace
    }

    pub(crate) fn autoload_names(&self) -> BTreeSet<String> {
        self.read(AUTOLOAD_KEY)
    }

    pub(crate) fn custom_resources(&self) -> Vec<CustomResource> {
        self.read(CUSTOM_RESOURCES_KEY)
    }

    pub(crate) fn save_autoload_names(&self, names: &BTreeSet<String>) {
        self.write(AUTOLOAD_KEY, names);
    }

    pub(crate) fn save_custom_resources(&self, resources: &[CustomResource]) {
        self.write(CUSTOM_RESOURCES_KEY, resources);
    }

    fn read<T: serde::de::DeserializeOwned + Default>(&self, key: &str) -> T {
        match &self.store {
            Some(store) => store.get_or(&self.namespace, key, T::default()),
            None => T::default(),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let Some(store) = &self.store else {
            tracing::debug!(key, "no settings store, keeping value in memory");
            return;
        };
        match store.set_typed(&self.namespace, key, value) {
            Ok(()) => store.schedule_save(),
            Err(err) => tracing::warn!(key, error = %err, "failed to persist loader setting"),
        }
    }
}
