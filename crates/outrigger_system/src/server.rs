//! Server runtime for plugin orchestration.
//!
//! The [`Server`] owns every shared component of the host integration. It is
//! intentionally minimal: it orders plugins, runs their lifecycle and stores
//! what they publish.
//!
//! # Storage
//!
//! - **APIs** - single-owner components (the resource loader, the scope
//!   resolver, the settings store). Reached with [`Server::api`].
//! - **Globals** - read-only configuration values. Reached with
//!   [`Server::get_global`].
//!
//! # Lifecycle
//!
//! 1. **Dependency Resolution** - Validate and topologically sort plugins
//! 2. **Build Phase** - Call `plugin.build()` in dependency order
//! 3. **Ready Phase** - Call `plugin.ready()` in dependency order
//! 4. **Cleanup Phase** - Call `plugin.cleanup()` in reverse order

use crate::api::API;
use crate::plugin::{BoxedPlugin, PluginId, Plugins};
use crate::resource::GlobalResource;
use core::any::{Any, TypeId};
use hashbrown::{HashMap, HashSet};

/// Type-erased storage for APIs and globals.
type Boxed = Box<dyn Any + Send + Sync>;

/// Build state of the server.
///
/// Progresses linearly: `NotStarted` → `Building` → `Built`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BuildState {
    #[default]
    NotStarted,
    Building,
    Built,
}

/// The runtime that orchestrates plugins and owns shared components.
///
/// # Example
///
/// ```ignore
/// use outrigger_system::server::Server;
///
/// let mut server = Server::new();
/// server
///     .add_plugins(DefaultPlugins.build())
///     .add_plugins(ResourceLoaderPlugin::new(injector))
///     .add_plugins(ScopePlugin::default());
/// server.finish();
///
/// let loader = server.api::<ResourceLoader>().unwrap();
/// ```
pub struct Server {
    globals: HashMap<TypeId, Boxed>,
    apis: HashMap<TypeId, Boxed>,
    /// Plugins waiting for `finish()`.
    pending_plugins: Vec<PluginEntry>,
    /// Plugins that have been built, in dependency order.
    built_plugins: Vec<PluginEntry>,
    plugin_ids: HashSet<PluginId>,
    build_state: BuildState,
}

struct PluginEntry {
    boxed: BoxedPlugin,
    /// Cached for error messages and dependency lookup.
    name: String,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// Creates a new empty server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            globals: HashMap::new(),
            apis: HashMap::new(),
            pending_plugins: Vec::new(),
            built_plugins: Vec::new(),
            plugin_ids: HashSet::new(),
            build_state: BuildState::NotStarted,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plugin Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds one or more plugins to the server.
    ///
    /// # Panics
    ///
    /// Panics if a unique plugin is added twice.
    pub fn add_plugins<P: Plugins>(&mut self, plugins: P) -> &mut Self {
        plugins.add_to_server(self);
        self
    }

    pub(crate) fn add_plugin_boxed(&mut self, boxed: BoxedPlugin) {
        let name = boxed.plugin.name().to_string();

        if boxed.plugin.is_unique() && self.plugin_ids.contains(&boxed.id) {
            panic!(
                "Plugin '{}' is unique and was already added.\n\
                 If you intended to add this plugin multiple times, \
                 set `is_unique()` to return `false`.",
                name
            );
        }
        self.plugin_ids.insert(boxed.id);

        let entry = PluginEntry { boxed, name };
        if self.build_state == BuildState::Building {
            // Added from inside another plugin's build(): build right away.
            entry.boxed.plugin.build(self);
            self.built_plugins.push(entry);
        } else {
            self.pending_plugins.push(entry);
        }
    }

    /// Returns true if a plugin of the given type has been added.
    #[must_use]
    pub fn has_plugin<P: crate::plugin::Plugin>(&self) -> bool {
        self.plugin_ids.contains(&PluginId::of::<P>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Globals
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts a global value, returning the previous one of the same type.
    pub fn insert_global<R: GlobalResource>(&mut self, value: R) -> Option<R> {
        self.globals
            .insert(TypeId::of::<R>(), Box::new(value))
            .and_then(|old| old.downcast::<R>().ok())
            .map(|b| *b)
    }

    /// Returns true if a global of type `R` exists.
    #[must_use]
    pub fn contains_global<R: GlobalResource>(&self) -> bool {
        self.globals.contains_key(&TypeId::of::<R>())
    }

    /// Gets a reference to a global value.
    #[must_use]
    pub fn get_global<R: GlobalResource>(&self) -> Option<&R> {
        self.globals
            .get(&TypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_ref::<R>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts an API into the server.
    ///
    /// If an API of this type already exists, it is replaced and the old value
    /// is returned.
    pub fn insert_api<A: API>(&mut self, api: A) -> Option<A> {
        self.apis
            .insert(TypeId::of::<A>(), Box::new(api))
            .and_then(|old| old.downcast::<A>().ok())
            .map(|b| *b)
    }

    /// Gets a reference to an API.
    ///
    /// Returns `None` if the API doesn't exist.
    #[must_use]
    pub fn api<A: API>(&self) -> Option<&A> {
        self.apis
            .get(&TypeId::of::<A>())
            .and_then(|boxed| boxed.downcast_ref::<A>())
    }

    /// Returns true if an API of type `A` exists.
    #[must_use]
    pub fn contains_api<A: API>(&self) -> bool {
        self.apis.contains_key(&TypeId::of::<A>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns whether `finish()` has completed.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.build_state == BuildState::Built
    }

    /// Builds all plugins and prepares the server for use.
    ///
    /// # Panics
    ///
    /// - If a plugin's dependency is not satisfied
    /// - If there is a circular dependency between plugins
    /// - If called more than once
    pub fn finish(&mut self) {
        if self.build_state != BuildState::NotStarted {
            panic!("Server::finish() was already called. Cannot build twice.");
        }

        let sorted = self.sort_plugins_by_dependencies();

        self.build_state = BuildState::Building;
        for entry in sorted {
            tracing::trace!(plugin = %entry.name, "building plugin");
            entry.boxed.plugin.build(self);
            self.built_plugins.push(entry);
        }

        // ready() needs `&mut self`, so the plugin list is moved out while it
        // runs. Plugins added during ready() land in `built_plugins` and are
        // appended afterwards.
        let plugins = core::mem::take(&mut self.built_plugins);
        for entry in &plugins {
            entry.boxed.plugin.ready(self);
        }
        let added_during_ready = core::mem::replace(&mut self.built_plugins, plugins);
        self.built_plugins.extend(added_during_ready);

        self.build_state = BuildState::Built;
        tracing::debug!(plugins = self.built_plugins.len(), "server ready");
    }

    /// Cleans up all plugins in reverse dependency order.
    pub fn cleanup(&mut self) {
        let plugins = core::mem::take(&mut self.built_plugins);
        for entry in plugins.iter().rev() {
            entry.boxed.plugin.cleanup(self);
        }
        self.built_plugins = plugins;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal: Dependency Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Sorts pending plugins by dependencies using Kahn's algorithm.
    fn sort_plugins_by_dependencies(&mut self) -> Vec<PluginEntry> {
        let pending = core::mem::take(&mut self.pending_plugins);
        let n = pending.len();

        let index_of: HashMap<PluginId, usize> = pending
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.boxed.id, i))
            .collect();

        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, entry) in pending.iter().enumerate() {
            for dep in entry.boxed.plugin.dependencies() {
                if let Some(&dep_idx) = index_of.get(&dep) {
                    dependents[dep_idx].push(i);
                    in_degree[i] += 1;
                } else {
                    panic!(
                        "Plugin '{}' requires '{}' which was not added.\n\
                         Add {} before {}, or use a plugin group that includes it.",
                        entry.name,
                        dep.type_name(),
                        dep.type_name(),
                        entry.name
                    );
                }
            }
        }

        // Seed in reverse so that, among independent plugins, insertion order
        // is preserved when popping from the back.
        let mut queue: Vec<usize> = (0..n).rev().filter(|&i| in_degree[i] == 0).collect();
        let mut order: Vec<usize> = Vec::with_capacity(n);

        while let Some(idx) = queue.pop() {
            order.push(idx);
            for &dependent in dependents[idx].iter().rev() {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push(dependent);
                }
            }
        }

        if order.len() != n {
            let in_cycle: Vec<&str> = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| pending[i].name.as_str())
                .collect();
            panic!(
                "Circular dependency detected among plugins: {:?}\n\
                 Break the cycle by extracting shared functionality into a separate plugin.",
                in_cycle
            );
        }

        let mut slots: Vec<Option<PluginEntry>> = pending.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect()
    }
}
