//! Simulated host integration built with Outrigger.
//!
//! Wires the resource loader and the scope resolver to a
//! [`SimulatedRuntime`] and models UI panels as add-ons that acquire the
//! libraries they need while their add-on is active.

pub mod runtime;

pub use runtime::SimulatedRuntime;

use outrigger_core_plugins::settings::SettingsDocument;
use outrigger_core_plugins::{DefaultPlugins, SettingsPlugin};
use outrigger_resources::{
    Handle, LoadMode, ResourceDescriptor, ResourceError, ResourceLoader, ResourceLoaderPlugin,
};
use outrigger_scope::{ScopeAPI, ScopePlugin};
use outrigger_system::plugin::PluginGroup;
use outrigger_system::server::Server;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable naming the settings file.
pub const SETTINGS_ENV: &str = "OUTRIGGER_SETTINGS";

const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the settings file named by [`SETTINGS_ENV`], or an in-memory
/// document when it is unset or unreadable.
#[must_use]
pub fn settings_document() -> SettingsDocument {
    let Ok(path) = std::env::var(SETTINGS_ENV) else {
        tracing::info!("{SETTINGS_ENV} not set, settings will not be saved");
        return SettingsDocument::in_memory();
    };
    match SettingsDocument::open(&path) {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!(%path, error = %err, "cannot open settings, using in-memory document");
            SettingsDocument::in_memory()
        }
    }
}

/// Resources the demo registers on top of the built-ins.
#[must_use]
pub fn demo_resources() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new(
            "chartjs",
            "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js",
            "Chart",
        )
        .with_description("Charting library"),
        ResourceDescriptor::new("jquery", "bundled", "jQuery")
            .with_description("Shipped with the host")
            .with_mode(LoadMode::AlwaysOn),
    ]
}

/// Builds and finishes a server around `settings` and `runtime`.
#[must_use]
pub fn build_server(settings: SettingsDocument, runtime: Arc<SimulatedRuntime>) -> Server {
    let mut loader = ResourceLoaderPlugin::with_shared_injector(runtime).with_load_timeout(LOAD_TIMEOUT);
    for descriptor in demo_resources() {
        loader = loader.with_resource(descriptor);
    }

    let mut server = Server::new();
    server
        .add_plugins(DefaultPlugins.build().set(SettingsPlugin::with_store(settings)))
        .add_plugins(loader)
        .add_plugins(ScopePlugin::new());
    server.finish();
    server
}

/// A UI panel belonging to an add-on.
#[derive(Debug, Clone, Copy)]
pub struct Panel {
    /// Consumer identifier used for references.
    pub id: &'static str,
    /// Add-on that owns the panel.
    pub addon: &'static str,
    /// Resources the panel needs.
    pub needs: &'static [&'static str],
}

/// Opens `panel` if its add-on is active in the current context.
///
/// Returns the acquired handles, or `None` when the add-on is inactive.
pub async fn open_panel(
    scope: &ScopeAPI,
    loader: &ResourceLoader,
    panel: Panel,
) -> Result<Option<Vec<Handle>>, ResourceError> {
    if !scope.is_active_now(panel.addon) {
        tracing::info!(panel = panel.id, addon = panel.addon, "add-on inactive, panel hidden");
        return Ok(None);
    }

    let mut handles = Vec::with_capacity(panel.needs.len());
    for name in panel.needs {
        handles.push(loader.acquire(name, panel.id).await?);
    }
    tracing::info!(panel = panel.id, resources = handles.len(), "panel opened");
    Ok(Some(handles))
}

/// Releases everything `panel` acquired.
pub fn close_panel(loader: &ResourceLoader, panel: Panel) {
    for name in panel.needs {
        match loader.release(name, panel.id) {
            Ok(release) => tracing::debug!(panel = panel.id, resource = *name, ?release, "released"),
            Err(err) => tracing::warn!(panel = panel.id, error = %err, "release failed"),
        }
    }
}
