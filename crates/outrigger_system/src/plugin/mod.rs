//! Plugin system for composing the host runtime.
//!
//! Every collaborator of the host (settings, context, logging, the resource
//! loader, the scope resolver) is delivered by a plugin. The server only
//! orders plugins and runs their lifecycle.
//!
//! # Example
//!
//! ```
//! use outrigger_system::plugin::{Plugin, PluginId};
//! use outrigger_system::resource::GlobalResource;
//! use outrigger_system::server::Server;
//!
//! # struct SettingsPlugin;
//! # impl Plugin for SettingsPlugin {
//! #     fn build(&self, _server: &mut Server) {}
//! # }
//! struct Namespace(String);
//! impl GlobalResource for Namespace {}
//!
//! struct NamespacePlugin {
//!     namespace: String,
//! }
//!
//! impl Plugin for NamespacePlugin {
//!     fn build(&self, server: &mut Server) {
//!         server.insert_global(Namespace(self.namespace.clone()));
//!     }
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<SettingsPlugin>()]
//!     }
//! }
//!
//! Server::new()
//!     .add_plugins(SettingsPlugin)
//!     .add_plugins(NamespacePlugin { namespace: "outrigger".into() })
//!     .finish();
//! ```

use core::any::TypeId;

use crate::server::Server;

// ─────────────────────────────────────────────────────────────────────────────
// PluginId
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for a plugin type.
///
/// Used for dependency resolution and duplicate detection. Based on [`TypeId`],
/// so each plugin type has exactly one `PluginId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId {
    type_id: TypeId,
    type_name: &'static str,
}

impl PluginId {
    /// Creates a `PluginId` for the given plugin type.
    #[must_use]
    pub fn of<P: Plugin>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: core::any::type_name::<P>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of host functionality with a managed lifecycle.
///
/// Plugins follow a strict lifecycle managed by the server:
///
/// 1. **Build Phase** - `build()` is called in dependency order
/// 2. **Ready Phase** - `ready()` is called in dependency order
/// 3. **Cleanup Phase** - `cleanup()` is called in reverse dependency order
pub trait Plugin: Send + Sync + 'static {
    /// Configures the server. Called once, after the plugin's dependencies
    /// have been built.
    ///
    /// Insert APIs and globals here. Keep it free of I/O beyond reading
    /// persisted settings.
    fn build(&self, server: &mut Server);

    /// Called after every plugin has been built.
    ///
    /// Use this to validate that collaborators exist or to log a summary of
    /// what was registered.
    fn ready(&self, _server: &mut Server) {}

    /// Called when the server is shutting down, in **reverse** dependency order.
    fn cleanup(&self, _server: &mut Server) {}

    /// Returns the plugin's name for debugging and error messages.
    ///
    /// Default implementation returns the type name.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Declares plugins that must be added before this one.
    ///
    /// The server panics in `finish()` if a dependency is missing.
    fn dependencies(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Returns true if this plugin can only be added once.
    ///
    /// Default is `true`. Adding the same unique plugin type twice panics.
    fn is_unique(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugins Trait (for add_plugins polymorphism)
// ─────────────────────────────────────────────────────────────────────────────

/// Types that can be handed to [`Server::add_plugins`].
///
/// Implemented for every [`Plugin`] and for [`PluginGroupBuilder`].
pub trait Plugins {
    /// Adds these plugins to the server.
    fn add_to_server(self, server: &mut Server);
}

impl<P: Plugin> Plugins for P {
    fn add_to_server(self, server: &mut Server) {
        // Capture the id while the concrete type is still known.
        server.add_plugin_boxed(BoxedPlugin::new(self));
    }
}

impl Plugins for PluginGroupBuilder {
    fn add_to_server(self, server: &mut Server) {
        for boxed in self.plugins {
            server.add_plugin_boxed(boxed);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroup
// ─────────────────────────────────────────────────────────────────────────────

/// A collection of plugins that can be added together.
///
/// # Example
///
/// ```ignore
/// pub struct DefaultPlugins;
///
/// impl PluginGroup for DefaultPlugins {
///     fn build(self) -> PluginGroupBuilder {
///         PluginGroupBuilder::new()
///             .add(TracingPlugin::default())
///             .add(SettingsPlugin::in_memory())
///             .add(ContextPlugin)
///     }
/// }
///
/// Server::new()
///     .add_plugins(DefaultPlugins.build().disable::<TracingPlugin>())
///     .finish();
/// ```
pub trait PluginGroup {
    /// Returns the plugins in this group.
    fn build(self) -> PluginGroupBuilder;
}

/// A boxed plugin with its captured [`PluginId`].
pub(crate) struct BoxedPlugin {
    pub(crate) id: PluginId,
    pub(crate) plugin: Box<dyn Plugin>,
}

impl BoxedPlugin {
    pub(crate) fn new<P: Plugin>(plugin: P) -> Self {
        Self {
            id: PluginId::of::<P>(),
            plugin: Box::new(plugin),
        }
    }
}

/// Builder for customizing plugin groups.
#[derive(Default)]
pub struct PluginGroupBuilder {
    pub(crate) plugins: Vec<BoxedPlugin>,
}

impl PluginGroupBuilder {
    /// Creates a new empty plugin group builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Adds a plugin to the end of the group.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "This is a builder method, not std::ops::Add"
    )]
    pub fn add<P: Plugin>(mut self, plugin: P) -> Self {
        self.plugins.push(BoxedPlugin::new(plugin));
        self
    }

    /// Replaces the group's plugin of type `P`, or appends it when absent.
    ///
    /// Useful for swapping a default collaborator for a configured one, e.g.
    /// a file-backed settings plugin in place of the in-memory default.
    #[must_use]
    pub fn set<P: Plugin>(mut self, plugin: P) -> Self {
        let id = PluginId::of::<P>();
        match self.plugins.iter().position(|p| p.id == id) {
            Some(index) => self.plugins[index] = BoxedPlugin::new(plugin),
            None => self.plugins.push(BoxedPlugin::new(plugin)),
        }
        self
    }

    /// Removes a plugin from the group by type.
    ///
    /// If the plugin is not found, this is a no-op.
    #[must_use]
    pub fn disable<P: Plugin>(mut self) -> Self {
        let id = PluginId::of::<P>();
        self.plugins.retain(|p| p.id != id);
        self
    }

    /// Returns the number of plugins in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if the group contains no plugins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PluginA;
    impl Plugin for PluginA {
        fn build(&self, _server: &mut Server) {}
    }

    struct PluginB;
    impl Plugin for PluginB {
        fn build(&self, _server: &mut Server) {}
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<PluginA>()]
        }
    }

    struct Repeatable;
    impl Plugin for Repeatable {
        fn build(&self, _server: &mut Server) {}
        fn is_unique(&self) -> bool {
            false
        }
    }

    #[test]
    fn plugin_id_equality() {
        assert_eq!(PluginId::of::<PluginA>(), PluginId::of::<PluginA>());
        assert_ne!(PluginId::of::<PluginA>(), PluginId::of::<PluginB>());
        assert_eq!(PluginId::of::<PluginA>().type_id(), TypeId::of::<PluginA>());
    }

    #[test]
    fn plugin_defaults() {
        let plugin = PluginA;
        assert!(plugin.name().contains("PluginA"));
        assert!(plugin.is_unique());
        assert!(plugin.dependencies().is_empty());
    }

    #[test]
    fn plugin_with_dependencies() {
        assert_eq!(PluginB.dependencies(), vec![PluginId::of::<PluginA>()]);
    }

    #[test]
    fn non_unique_plugin_can_be_added_repeatedly() {
        let mut server = Server::new();
        server.add_plugins(Repeatable);
        server.add_plugins(Repeatable);
        server.finish();
        assert!(server.has_plugin::<Repeatable>());
    }

    #[test]
    #[should_panic(expected = "is unique and was already added")]
    fn unique_plugin_added_twice_panics() {
        let mut server = Server::new();
        server.add_plugins(PluginA);
        server.add_plugins(PluginA);
    }

    struct Tagged;
    impl Plugin for Tagged {
        fn build(&self, _server: &mut Server) {}
    }

    struct TestGroup;
    impl PluginGroup for TestGroup {
        fn build(self) -> PluginGroupBuilder {
            PluginGroupBuilder::new().add(PluginA).add(Tagged)
        }
    }

    #[test]
    fn group_builds_in_order() {
        let builder = TestGroup.build();
        assert_eq!(builder.len(), 2);
        assert!(builder.plugins[0].plugin.name().contains("PluginA"));
        assert!(builder.plugins[1].plugin.name().contains("Tagged"));
    }

    #[test]
    fn disable_removes_by_type() {
        let builder = TestGroup.build().disable::<PluginA>();
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.plugins[0].id, PluginId::of::<Tagged>());
    }

    #[test]
    fn disable_missing_is_noop() {
        let builder = PluginGroupBuilder::new().add(PluginA).disable::<Tagged>();
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn set_replaces_in_place() {
        let builder = TestGroup.build().set(Tagged).set(PluginA);
        assert_eq!(builder.len(), 2);
        assert_eq!(builder.plugins[1].id, PluginId::of::<Tagged>());
    }

    #[test]
    fn set_appends_when_absent() {
        let builder = PluginGroupBuilder::new().set(PluginA);
        assert_eq!(builder.len(), 1);
        assert!(!builder.is_empty());
    }
}
