//! # Outrigger Internal Library
//!
//! Re-exports the Outrigger crates for convenience.

/// Plugin runtime.
pub use outrigger_system;

/// Settings, context and tracing collaborators.
pub use outrigger_core_plugins;

/// Resource registry and loader.
pub use outrigger_resources;

/// Per-context add-on activation.
pub use outrigger_scope;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use outrigger_core_plugins::{
        ContextAPI, ContextEvent, ContextPlugin, DefaultPlugins, MinimalPlugins, SettingsAPI,
        SettingsDocument, SettingsPlugin, SettingsStore, SettingsStoreExt, TracingPlugin,
    };
    pub use outrigger_resources::{
        Handle, InjectError, Injector, LoadMode, LoadReport, Release, ResourceDescriptor,
        ResourceError, ResourceLoader, ResourceLoaderPlugin, ResourceSource, ResourceState,
    };
    pub use outrigger_scope::{Decision, ResolverModel, ScopeAPI, ScopePlugin};
    pub use outrigger_system::prelude::*;
}
