//! Host collaborator plugins for Outrigger.
//!
//! The resource loader and the scope resolver depend on a few collaborators
//! that the host normally supplies. This crate provides them as plugins:
//!
//! - [`SettingsPlugin`] - Namespaced settings with debounced persistence
//! - [`ContextPlugin`] - Current context identifier and change events
//! - [`TracingPlugin`] - Logging via the `tracing` crate
//! - [`DefaultPlugins`] - All three, with in-memory settings
//!
//! # Example
//!
//! ```no_run
//! use outrigger_core_plugins::{DefaultPlugins, SettingsDocument, SettingsPlugin};
//! use outrigger_system::plugin::PluginGroup;
//! use outrigger_system::server::Server;
//!
//! let settings = SettingsDocument::open("outrigger.json").unwrap();
//!
//! let mut server = Server::new();
//! server.add_plugins(DefaultPlugins.build().set(SettingsPlugin::with_store(settings)));
//! server.finish();
//! ```

pub mod context;
pub mod settings;
mod tracing_plugin;

pub use context::{ContextAPI, ContextEvent, ContextPlugin};
pub use settings::{
    SettingsAPI, SettingsDocument, SettingsError, SettingsPlugin, SettingsStore, SettingsStoreExt,
};
pub use tracing_plugin::{LOG_ENV, LOG_FORMAT_ENV, TracingConfig, TracingFormat, TracingPlugin};

use outrigger_system::plugin::{PluginGroup, PluginGroupBuilder};

/// Default collaborators for a host integration.
///
/// Includes:
/// - [`TracingPlugin`] configured from the environment
/// - [`SettingsPlugin`] with an in-memory document
/// - [`ContextPlugin`]
pub struct DefaultPlugins;

impl PluginGroup for DefaultPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(TracingPlugin::from_env())
            .add(SettingsPlugin::in_memory())
            .add(ContextPlugin)
    }
}

/// Collaborators without logging, for tests and headless use.
pub struct MinimalPlugins;

impl PluginGroup for MinimalPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(SettingsPlugin::in_memory())
            .add(ContextPlugin)
    }
}
