//! Startup loading.
//!
//! The autoload set is a persisted list of resource names. At startup
//! [`ResourceLoader::autoload`] loads every always-on resource plus every
//! flagged one, once per loader.

use crate::loader::{LoadReport, ResourceLoader};
use std::sync::atomic::Ordering;

impl ResourceLoader {
    /// Flags or unflags a resource for loading at startup and persists the
    /// autoload set. Does not load anything.
    ///
    /// The name is remembered even if nothing is registered under it yet, so
    /// a resource registered later picks the flag up.
    pub fn set_autoload(&self, name: &str, enabled: bool) {
        let mut guard = self.core.state.lock();
        let state = &mut *guard;
        match state.descriptors.get_mut(name) {
            Some(descriptor) => descriptor.set_autoload(enabled),
            None => tracing::debug!(resource = name, "autoload flag set before registration"),
        }

        let changed = if enabled {
            state.autoload_names.insert(name.to_owned())
        } else {
            state.autoload_names.remove(name)
        };
        if changed {
            self.core.settings.save_autoload_names(&state.autoload_names);
        }
        tracing::debug!(resource = name, enabled, changed, "autoload preference updated");
    }

    /// Names in the autoload set, sorted.
    #[must_use]
    pub fn autoload_names(&self) -> Vec<String> {
        self.core
            .state
            .lock()
            .autoload_names
            .iter()
            .cloned()
            .collect()
    }

    /// Loads every always-on or autoload-flagged resource that is not loaded.
    ///
    /// Runs at most once per loader; later calls return an empty report.
    /// Failures are independent and reported, never propagated.
    pub async fn autoload(&self) -> LoadReport {
        if self.autoloaded.swap(true, Ordering::AcqRel) {
            tracing::debug!("autoload already ran");
            return LoadReport::default();
        }

        let candidates: Vec<String> = {
            let state = self.core.state.lock();
            state
                .descriptors
                .values()
                .filter(|descriptor| descriptor.wants_startup_load() && !descriptor.is_loaded())
                .map(|descriptor| descriptor.name().to_owned())
                .collect()
        };
        tracing::info!(count = candidates.len(), "autoloading resources");

        let report = self.load_each(candidates).await;
        for (name, err) in &report.failed {
            tracing::warn!(resource = %name, error = %err, "autoload failed");
        }
        report
    }

    /// Whether [`autoload`](Self::autoload) has run.
    #[must_use]
    pub fn has_autoloaded(&self) -> bool {
        self.autoloaded.load(Ordering::Acquire)
    }
}
