//! Registry and single-flight loader.
//!
//! Every load of a resource goes through one in-flight entry. The first
//! caller spawns the injection as a task and publishes a shared future;
//! concurrent callers join that future instead of injecting again. The task
//! settles the descriptor and removes the entry itself, so the load completes
//! even if every caller stops waiting.

use crate::builtins::builtin_resources;
use crate::descriptor::{ResourceDescriptor, ResourceSource, ResourceState};
use crate::error::ResourceError;
use crate::injector::{Handle, InjectError, Injector};
use crate::persist::{CustomResource, DEFAULT_NAMESPACE, LoaderSettings};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use indexmap::IndexMap;
use outrigger_core_plugins::settings::SettingsStore;
use outrigger_system::api::API;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

type PendingLoad = Shared<BoxFuture<'static, Result<Handle, ResourceError>>>;

struct InFlight {
    id: u64,
    pending: PendingLoad,
}

pub(crate) struct LoaderState {
    pub(crate) descriptors: IndexMap<String, ResourceDescriptor>,
    in_flight: HashMap<String, InFlight>,
    pub(crate) autoload_names: BTreeSet<String>,
    custom: Vec<CustomResource>,
}

impl LoaderState {
    pub(crate) fn descriptor_mut(
        &mut self,
        name: &str,
    ) -> Result<&mut ResourceDescriptor, ResourceError> {
        self.descriptors
            .get_mut(name)
            .ok_or_else(|| ResourceError::NotRegistered(name.to_owned()))
    }

    /// Whether following prerequisites from `name` leads back to `name`.
    fn has_prerequisite_cycle(&self, name: &str) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self
            .descriptors
            .get(name)
            .map(|descriptor| descriptor.requires().iter().map(String::as_str).collect())
            .unwrap_or_default();
        while let Some(next) = stack.pop() {
            if next == name {
                return true;
            }
            if !seen.insert(next) {
                continue;
            }
            if let Some(descriptor) = self.descriptors.get(next) {
                stack.extend(descriptor.requires().iter().map(String::as_str));
            }
        }
        false
    }

    fn settle(&mut self, id: u64, name: &str) {
        if self.in_flight.get(name).is_some_and(|entry| entry.id == id) {
            self.in_flight.remove(name);
        }
    }
}

pub(crate) struct LoaderCore {
    pub(crate) state: Mutex<LoaderState>,
    pub(crate) settings: LoaderSettings,
    injector: Arc<dyn Injector>,
    load_timeout: Option<Duration>,
    next_load_id: AtomicU64,
}

struct LoadJob {
    name: String,
    source: ResourceSource,
    exposed_as: String,
    requires: Vec<String>,
}

enum LoadStart {
    Ready(Handle),
    Pending(PendingLoad),
}

impl LoaderCore {
    fn insert(&self, mut descriptor: ResourceDescriptor) -> bool {
        // Resolved before locking; the injector never calls back into the loader.
        let present = if descriptor.is_loaded() {
            None
        } else {
            self.injector.lookup(descriptor.exposed_as())
        };

        let mut state = self.state.lock();
        if state.descriptors.contains_key(descriptor.name()) {
            tracing::debug!(
                resource = descriptor.name(),
                "already registered, keeping existing descriptor"
            );
            return false;
        }
        if state.autoload_names.contains(descriptor.name()) {
            descriptor.set_autoload(true);
        }
        if let Some(handle) = present {
            tracing::debug!(
                resource = descriptor.name(),
                exposed_as = descriptor.exposed_as(),
                "already present in runtime"
            );
            descriptor.mark_loaded(handle);
        }
        tracing::trace!(resource = descriptor.name(), source = %descriptor.source(), "registered");
        state
            .descriptors
            .insert(descriptor.name().to_owned(), descriptor);
        true
    }

    async fn load(self: &Arc<Self>, name: &str) -> Result<Handle, ResourceError> {
        match self.begin_load(name)? {
            LoadStart::Ready(handle) => Ok(handle),
            LoadStart::Pending(pending) => pending.await,
        }
    }

    fn begin_load(self: &Arc<Self>, name: &str) -> Result<LoadStart, ResourceError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let descriptor = state
            .descriptors
            .get(name)
            .ok_or_else(|| ResourceError::NotRegistered(name.to_owned()))?;
        if let Some(handle) = descriptor.handle() {
            tracing::trace!(resource = name, "already loaded");
            return Ok(LoadStart::Ready(handle.clone()));
        }
        if let Some(entry) = state.in_flight.get(name) {
            tracing::debug!(resource = name, "joining in-flight load");
            return Ok(LoadStart::Pending(entry.pending.clone()));
        }

        if state.has_prerequisite_cycle(name) {
            tracing::warn!(resource = name, "refusing load with prerequisite cycle");
            return Err(ResourceError::PrerequisiteCycle {
                name: name.to_owned(),
            });
        }

        let job = LoadJob {
            name: name.to_owned(),
            source: descriptor.source().clone(),
            exposed_as: descriptor.exposed_as().to_owned(),
            requires: descriptor.requires().to_vec(),
        };
        let id = self.next_load_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(resource = name, source = %job.source, "starting load");

        let task = tokio::spawn(Arc::clone(self).run_load(id, job));
        let core = Arc::downgrade(self);
        let owned_name = name.to_owned();
        let pending = async move {
            match task.await {
                Ok(result) => result,
                Err(err) => {
                    tracing::error!(resource = %owned_name, error = %err, "load task ended abnormally");
                    abandon(&core, id, &owned_name);
                    Err(ResourceError::Aborted { name: owned_name })
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            name.to_owned(),
            InFlight {
                id,
                pending: pending.clone(),
            },
        );
        Ok(LoadStart::Pending(pending))
    }

    async fn run_load(self: Arc<Self>, id: u64, job: LoadJob) -> Result<Handle, ResourceError> {
        let LoadJob {
            name,
            source,
            exposed_as,
            requires,
        } = job;
        let outcome = match self.load_prerequisites(&name, &requires).await {
            Ok(()) => self.inject(&name, &source, &exposed_as).await,
            Err(err) => Err(err),
        };

        let mut state = self.state.lock();
        state.settle(id, &name);
        let descriptor = state.descriptors.get_mut(&name);
        match outcome {
            Ok(handle) => {
                if let Some(descriptor) = descriptor {
                    descriptor.mark_loaded(handle.clone());
                }
                tracing::info!(resource = %name, exposed_as = %handle, "resource loaded");
                Ok(handle)
            }
            Err(err) => {
                if let Some(descriptor) = descriptor {
                    descriptor.record_failure(err.to_string());
                }
                tracing::warn!(resource = %name, error = %err, "resource load failed");
                Err(err)
            }
        }
    }

    async fn load_prerequisites(
        self: &Arc<Self>,
        name: &str,
        requires: &[String],
    ) -> Result<(), ResourceError> {
        for prerequisite in requires {
            tracing::debug!(resource = name, %prerequisite, "loading prerequisite");
            self.load(prerequisite)
                .await
                .map_err(|cause| ResourceError::PrerequisiteFailed {
                    name: name.to_owned(),
                    prerequisite: prerequisite.clone(),
                    cause: Box::new(cause),
                })?;
        }
        Ok(())
    }

    async fn inject(
        &self,
        name: &str,
        source: &ResourceSource,
        exposed_as: &str,
    ) -> Result<Handle, ResourceError> {
        let injection = async {
            if source.is_sentinel() {
                return self
                    .injector
                    .lookup(exposed_as)
                    .ok_or_else(|| InjectError::NotExposed(exposed_as.to_owned()));
            }
            self.injector.inject(source, exposed_as).await
        };

        let result = match self.load_timeout {
            Some(after) => tokio::time::timeout(after, injection)
                .await
                .map_err(|_| ResourceError::TimedOut {
                    name: name.to_owned(),
                    after,
                })?,
            None => injection.await,
        };
        result.map_err(|cause| ResourceError::LoadFailed {
            name: name.to_owned(),
            cause,
        })
    }
}

fn abandon(core: &Weak<LoaderCore>, id: u64, name: &str) {
    if let Some(core) = core.upgrade() {
        core.state.lock().settle(id, name);
    }
}

/// Outcome of loading a batch of resources.
///
/// Failures are independent: one failed resource never prevents the others
/// from loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Resources that ended up loaded.
    pub loaded: Vec<String>,
    /// Resources that failed, with the reason.
    pub failed: Vec<(String, ResourceError)>,
}

impl LoadReport {
    /// Whether every resource in the batch loaded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Resource registry with coalesced loading, autoload and reference tracking.
///
/// Registered as an API by [`ResourceLoaderPlugin`](crate::ResourceLoaderPlugin);
/// clones share the same registry.
///
/// # Example
///
/// ```ignore
/// let injector = Arc::new(MockInjector::new());
/// let loader = ResourceLoader::builder(injector.clone()).build();
///
/// let (a, b) = tokio::join!(loader.load("axios"), loader.load("axios"));
/// assert_eq!(a?, b?);
/// assert_eq!(injector.injections("axios"), 1);
/// ```
#[derive(Clone)]
pub struct ResourceLoader {
    pub(crate) core: Arc<LoaderCore>,
    pub(crate) autoloaded: Arc<AtomicBool>,
}

impl API for ResourceLoader {}

impl core::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.core.state.lock();
        f.debug_struct("ResourceLoader")
            .field("namespace", &self.core.settings.namespace())
            .field("registered", &state.descriptors.len())
            .field("in_flight", &state.in_flight.len())
            .field("load_timeout", &self.core.load_timeout)
            .finish()
    }
}

impl ResourceLoader {
    /// Starts configuring a loader that injects through `injector`.
    #[must_use]
    pub fn builder(injector: Arc<dyn Injector>) -> ResourceLoaderBuilder {
        ResourceLoaderBuilder::new(injector)
    }

    /// Registers a resource.
    ///
    /// Returns `false` and leaves the registry untouched when the name is
    /// already registered. If the runtime already exposes `exposed_as`, the
    /// resource is recorded as loaded right away.
    pub fn register(
        &self,
        name: impl Into<String>,
        source: impl Into<ResourceSource>,
        exposed_as: impl Into<String>,
        description: Option<&str>,
    ) -> bool {
        let descriptor = ResourceDescriptor::new(name, source, exposed_as);
        let descriptor = match description {
            Some(description) => descriptor.with_description(description),
            None => descriptor,
        };
        self.register_descriptor(descriptor)
    }

    /// Registers a fully configured descriptor. Same rules as [`register`](Self::register).
    pub fn register_descriptor(&self, descriptor: ResourceDescriptor) -> bool {
        self.core.insert(descriptor)
    }

    /// Registers a user-supplied resource and remembers it in settings so it
    /// is registered again on the next start.
    ///
    /// The exposed handle defaults to `name`. Returns `false` without
    /// persisting anything if the name is taken.
    pub fn add_custom(
        &self,
        name: &str,
        source: impl Into<ResourceSource>,
        exposed_handle: Option<&str>,
        description: Option<&str>,
    ) -> bool {
        let resource = CustomResource {
            name: name.to_owned(),
            source: source.into(),
            exposed_handle: exposed_handle.unwrap_or(name).to_owned(),
            description: description.map(str::to_owned),
        };
        if !self.core.insert(resource.to_descriptor()) {
            return false;
        }
        let mut state = self.core.state.lock();
        state.custom.push(resource);
        self.core.settings.save_custom_resources(&state.custom);
        true
    }

    /// Loads a resource, reusing a completed or in-flight load.
    ///
    /// At most one injection per resource is ever in flight; concurrent
    /// callers all observe its outcome. A failed load leaves the resource
    /// registered and unloaded, so a later call retries.
    ///
    /// Prerequisites are loaded first, in declared order; if one fails the
    /// resource is not injected and the failure is reported as
    /// [`ResourceError::PrerequisiteFailed`].
    ///
    /// Must be awaited inside a Tokio runtime.
    pub async fn load(&self, name: &str) -> Result<Handle, ResourceError> {
        self.core.load(name).await
    }

    /// Loads several resources concurrently.
    ///
    /// Returns the handles in input order, or the first error in input
    /// order. Resources that loaded stay loaded either way.
    pub async fn load_multiple<I, S>(&self, names: I) -> Result<Vec<Handle>, ResourceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        join_all(names.iter().map(|name| self.load(name.as_ref())))
            .await
            .into_iter()
            .collect()
    }

    /// Loads every registered resource that is not loaded yet.
    pub async fn load_all(&self) -> LoadReport {
        let names = {
            let state = self.core.state.lock();
            state
                .descriptors
                .values()
                .filter(|descriptor| !descriptor.is_loaded())
                .map(|descriptor| descriptor.name().to_owned())
                .collect()
        };
        self.load_each(names).await
    }

    pub(crate) async fn load_each(&self, names: Vec<String>) -> LoadReport {
        let results = join_all(names.into_iter().map(|name| async move {
            let result = self.load(&name).await;
            (name, result)
        }))
        .await;

        let mut report = LoadReport::default();
        for (name, result) in results {
            match result {
                Ok(_) => report.loaded.push(name),
                Err(err) => report.failed.push((name, err)),
            }
        }
        report
    }

    /// Whether the resource is registered and loaded.
    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.core
            .state
            .lock()
            .descriptors
            .get(name)
            .is_some_and(ResourceDescriptor::is_loaded)
    }

    /// Lifecycle state, or `None` for an unknown name.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<ResourceState> {
        let state = self.core.state.lock();
        let descriptor = state.descriptors.get(name)?;
        Some(if descriptor.is_loaded() {
            ResourceState::Loaded
        } else if state.in_flight.contains_key(name) {
            ResourceState::Loading
        } else {
            ResourceState::Registered
        })
    }

    /// Snapshot of one descriptor.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<ResourceDescriptor> {
        self.core.state.lock().descriptors.get(name).cloned()
    }

    /// Snapshot of every descriptor, in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ResourceDescriptor> {
        self.core
            .state
            .lock()
            .descriptors
            .values()
            .cloned()
            .collect()
    }

    /// Names of loaded resources, in registration order.
    #[must_use]
    pub fn loaded_names(&self) -> Vec<String> {
        self.core
            .state
            .lock()
            .descriptors
            .values()
            .filter(|descriptor| descriptor.is_loaded())
            .map(|descriptor| descriptor.name().to_owned())
            .collect()
    }

    /// Message of the most recent failed load of `name`.
    #[must_use]
    pub fn last_error(&self, name: &str) -> Option<String> {
        self.core
            .state
            .lock()
            .descriptors
            .get(name)
            .and_then(|descriptor| descriptor.last_error().map(str::to_owned))
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.state.lock().descriptors.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether preferences are backed by a settings store.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.core.settings.is_persistent()
    }
}

/// Configures a [`ResourceLoader`].
pub struct ResourceLoaderBuilder {
    injector: Arc<dyn Injector>,
    settings: Option<Arc<dyn SettingsStore>>,
    namespace: String,
    load_timeout: Option<Duration>,
    builtins: bool,
    resources: Vec<ResourceDescriptor>,
}

impl ResourceLoaderBuilder {
    fn new(injector: Arc<dyn Injector>) -> Self {
        Self {
            injector,
            settings: None,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            load_timeout: None,
            builtins: true,
            resources: Vec::new(),
        }
    }

    /// Persists preferences in `store`. Without one they live in memory.
    #[must_use]
    pub fn settings(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(store);
        self
    }

    /// Settings namespace for the persisted keys.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Fails loads whose injection takes longer than `timeout`.
    #[must_use]
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Skips the built-in resource table.
    #[must_use]
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    /// Registers `descriptor` when the loader is built.
    #[must_use]
    pub fn resource(mut self, descriptor: ResourceDescriptor) -> Self {
        self.resources.push(descriptor);
        self
    }

    /// Builds the loader.
    ///
    /// Restores persisted preferences, then registers built-ins, configured
    /// resources and persisted custom resources in that order. The first
    /// registration of a name wins.
    #[must_use]
    pub fn build(self) -> ResourceLoader {
        let settings = LoaderSettings::new(self.settings, self.namespace);
        let autoload_names = settings.autoload_names();
        let custom = settings.custom_resources();

        let core = Arc::new(LoaderCore {
            state: Mutex::new(LoaderState {
                descriptors: IndexMap::new(),
                in_flight: HashMap::new(),
                autoload_names,
                custom: custom.clone(),
            }),
            settings,
            injector: self.injector,
            load_timeout: self.load_timeout,
            next_load_id: AtomicU64::new(0),
        });

        let builtins = if self.builtins {
            builtin_resources()
        } else {
            Vec::new()
        };
        let custom_descriptors = custom.iter().map(CustomResource::to_descriptor);
        for descriptor in builtins
            .into_iter()
            .chain(self.resources)
            .chain(custom_descriptors)
        {
            core.insert(descriptor);
        }

        let loader = ResourceLoader {
            core,
            autoloaded: Arc::new(AtomicBool::new(false)),
        };
        tracing::debug!(
            registered = loader.len(),
            persistent = loader.is_persistent(),
            "resource loader ready"
        );
        loader
    }
}
