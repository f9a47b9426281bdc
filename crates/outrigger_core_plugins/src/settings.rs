//! Settings persistence for host collaborators.
//!
//! This module provides:
//!
//! - [`SettingsStore`] - The settings collaborator: namespaced JSON values plus
//!   a fire-and-forget `schedule_save()`.
//! - [`SettingsStoreExt`] - Typed helpers layered over any store.
//! - [`SettingsDocument`] - The bundled store: an in-memory document that can
//!   be backed by a JSON file with debounced saves.
//! - [`SettingsAPI`] / [`SettingsPlugin`] - How the store reaches other plugins.
//!
//! # Layout
//!
//! The document is a two-level JSON object, `{ namespace: { key: value } }`:
//!
//! ```json
//! {
//!   "outrigger": {
//!     "autoloadResourceNames": ["axios"],
//!     "scopeBindings": { "ext1": { "targets": ["Alice"] } }
//!   }
//! }
//! ```

use outrigger_system::api::API;
use outrigger_system::plugin::Plugin;
use outrigger_system::server::Server;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Delay between the first `schedule_save()` and the write it triggers.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

// ─────────────────────────────────────────────────────────────────────────────
// Error Type
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No settings store was installed.
    #[error("settings store unavailable, changes are kept in memory only")]
    PersistenceUnavailable,

    /// Serialization or deserialization failed.
    #[error("settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing the backing file failed.
    #[error("settings file {}: {source}", .path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// SettingsStore Trait
// ─────────────────────────────────────────────────────────────────────────────

/// The settings collaborator.
///
/// Writes land in memory synchronously; durability is the store's concern and
/// is requested with [`schedule_save`](Self::schedule_save), which never
/// blocks the caller.
pub trait SettingsStore: Send + Sync + 'static {
    /// Returns the value stored under `namespace.key`, if any.
    fn get_scoped_value(&self, namespace: &str, key: &str) -> Option<Value>;

    /// Stores `value` under `namespace.key`.
    fn set_scoped_value(&self, namespace: &str, key: &str, value: Value);

    /// Requests that pending changes be written out. Debounced, fire-and-forget.
    fn schedule_save(&self);

    /// Writes pending changes immediately.
    fn flush(&self) -> Result<(), SettingsError> {
        Ok(())
    }
}

/// Typed access on top of [`SettingsStore`].
pub trait SettingsStoreExt: SettingsStore {
    /// Reads and deserializes `namespace.key`, falling back to `default` when
    /// the key is absent or holds a value of the wrong shape.
    fn get_or<T: DeserializeOwned>(&self, namespace: &str, key: &str, default: T) -> T {
        let Some(value) = self.get_scoped_value(namespace, key) else {
            return default;
        };
        match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(namespace, key, error = %err, "ignoring malformed setting");
                default
            }
        }
    }

    /// Serializes `value` into `namespace.key`.
    fn set_typed<T: Serialize + ?Sized>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
    ) -> Result<(), SettingsError> {
        let value = serde_json::to_value(value)?;
        self.set_scoped_value(namespace, key, value);
        Ok(())
    }
}

impl<S: SettingsStore + ?Sized> SettingsStoreExt for S {}

// ─────────────────────────────────────────────────────────────────────────────
// SettingsDocument
// ─────────────────────────────────────────────────────────────────────────────

/// JSON settings document, optionally persisted to a file.
///
/// Cloning is cheap and yields a handle to the same document.
///
/// ```
/// use outrigger_core_plugins::settings::{SettingsDocument, SettingsStore, SettingsStoreExt};
///
/// let doc = SettingsDocument::in_memory();
/// doc.set_typed("outrigger", "autoloadResourceNames", &["axios"]).unwrap();
///
/// let names: Vec<String> = doc.get_or("outrigger", "autoloadResourceNames", Vec::new());
/// assert_eq!(names, vec!["axios".to_string()]);
/// ```
#[derive(Clone)]
pub struct SettingsDocument {
    inner: Arc<DocumentInner>,
}

struct DocumentInner {
    root: RwLock<Map<String, Value>>,
    path: Option<PathBuf>,
    /// Save delay in milliseconds, shared by every clone.
    debounce_ms: AtomicU64,
    /// Held across snapshot, write and rename.
    write_lock: Mutex<()>,
    save_armed: AtomicBool,
    saves: AtomicU64,
}

impl core::fmt::Debug for SettingsDocument {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SettingsDocument")
            .field("path", &self.inner.path)
            .field("debounce", &self.debounce())
            .field("saves", &self.save_count())
            .finish_non_exhaustive()
    }
}

impl SettingsDocument {
    fn from_parts(root: Map<String, Value>, path: Option<PathBuf>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                root: RwLock::new(root),
                path,
                debounce_ms: AtomicU64::new(millis(debounce)),
                write_lock: Mutex::new(()),
                save_armed: AtomicBool::new(false),
                saves: AtomicU64::new(0),
            }),
        }
    }

    /// Creates an empty document that is never written anywhere.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_parts(Map::new(), None, DEFAULT_DEBOUNCE)
    }

    /// Opens a file-backed document, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// JSON object.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let root = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), namespaces = root.len(), "opened settings document");
        Ok(Self::from_parts(root, Some(path), DEFAULT_DEBOUNCE))
    }

    /// Sets the save delay. Applies to every clone of this document.
    #[must_use]
    pub fn with_debounce(self, debounce: Duration) -> Self {
        self.inner
            .debounce_ms
            .store(millis(debounce), Ordering::Release);
        self
    }

    /// Delay between the first `schedule_save()` and the write it triggers.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        self.inner.debounce()
    }

    /// The backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Number of completed writes to the backing file.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.inner.saves.load(Ordering::Acquire)
    }

    /// A copy of the whole document.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        Value::Object(self.inner.root.read().clone())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl DocumentInner {
    fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.load(Ordering::Acquire))
    }

    fn write_to_disk(&self) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        // Writers share one staging file, and a later snapshot must never be
        // overwritten by an earlier one.
        let _writing = self.write_lock.lock();
        let text = serde_json::to_string_pretty(&*self.root.read())?;
        let io_err = |source| SettingsError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        // Write-then-rename so a crash never leaves a truncated document.
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, text).map_err(io_err)?;
        std::fs::rename(&staging, path).map_err(io_err)?;

        let saves = self.saves.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(path = %path.display(), saves, "settings written");
        Ok(())
    }
}

impl SettingsStore for SettingsDocument {
    fn get_scoped_value(&self, namespace: &str, key: &str) -> Option<Value> {
        self.inner
            .root
            .read()
            .get(namespace)
            .and_then(|scope| scope.get(key))
            .cloned()
    }

    fn set_scoped_value(&self, namespace: &str, key: &str, value: Value) {
        let mut root = self.inner.root.write();
        let scope = root
            .entry(namespace.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !scope.is_object() {
            tracing::warn!(namespace, "replacing non-object settings namespace");
            *scope = Value::Object(Map::new());
        }
        if let Value::Object(map) = scope {
            map.insert(key.to_owned(), value);
        }
    }

    fn schedule_save(&self) {
        if self.inner.path.is_none() {
            return;
        }
        // A save is already armed; this change rides along with it.
        if self.inner.save_armed.swap(true, Ordering::AcqRel) {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let inner = Arc::clone(&self.inner);
                runtime.spawn(async move {
                    tokio::time::sleep(inner.debounce()).await;
                    // Disarm before writing so changes made during the write
                    // schedule a fresh save.
                    inner.save_armed.store(false, Ordering::Release);
                    let written = tokio::task::spawn_blocking(move || inner.write_to_disk()).await;
                    match written {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => {
                            tracing::warn!(error = %err, "debounced settings save failed");
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "debounced settings save did not finish");
                        }
                    }
                });
            }
            Err(_) => {
                self.inner.save_armed.store(false, Ordering::Release);
                if let Err(err) = self.inner.write_to_disk() {
                    tracing::warn!(error = %err, "settings save failed");
                }
            }
        }
    }

    fn flush(&self) -> Result<(), SettingsError> {
        self.inner.write_to_disk()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SettingsAPI / SettingsPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Hands the installed [`SettingsStore`] to other plugins.
pub struct SettingsAPI {
    store: Option<Arc<dyn SettingsStore>>,
}

impl API for SettingsAPI {}

impl SettingsAPI {
    /// Wraps an installed store.
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store: Some(store) }
    }

    /// An API with no store behind it.
    #[must_use]
    pub fn detached() -> Self {
        Self { store: None }
    }

    /// Returns the installed store.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::PersistenceUnavailable`] when no store is installed.
    pub fn store(&self) -> Result<Arc<dyn SettingsStore>, SettingsError> {
        self.store
            .clone()
            .ok_or(SettingsError::PersistenceUnavailable)
    }
}

/// Resolves the settings store for a consumer plugin.
///
/// Missing stores are logged once here and the consumer carries on in memory.
#[must_use]
pub fn store_for(server: &Server, consumer: &str) -> Option<Arc<dyn SettingsStore>> {
    let result = server
        .api::<SettingsAPI>()
        .ok_or(SettingsError::PersistenceUnavailable)
        .and_then(SettingsAPI::store);
    match result {
        Ok(store) => Some(store),
        Err(err) => {
            tracing::warn!(consumer, error = %err, "persistence disabled");
            None
        }
    }
}

/// Plugin that installs the settings store.
///
/// # Example
///
/// ```no_run
/// use outrigger_core_plugins::settings::{SettingsDocument, SettingsPlugin};
/// use outrigger_system::server::Server;
///
/// let document = SettingsDocument::open("settings.json").unwrap();
///
/// let mut server = Server::new();
/// server.add_plugins(SettingsPlugin::with_store(document));
/// server.finish();
/// ```
pub struct SettingsPlugin {
    store: Option<Arc<dyn SettingsStore>>,
}

impl Default for SettingsPlugin {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SettingsPlugin {
    /// Uses a fresh in-memory [`SettingsDocument`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_store(SettingsDocument::in_memory())
    }

    /// Uses the given store.
    #[must_use]
    pub fn with_store(store: impl SettingsStore) -> Self {
        Self::with_shared_store(Arc::new(store))
    }

    /// Uses an already shared store.
    #[must_use]
    pub fn with_shared_store(store: Arc<dyn SettingsStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Installs no store at all; consumers run in memory only.
    #[must_use]
    pub fn detached() -> Self {
        Self { store: None }
    }
}

impl Plugin for SettingsPlugin {
    fn build(&self, server: &mut Server) {
        let api = match &self.store {
            Some(store) => SettingsAPI::new(Arc::clone(store)),
            None => SettingsAPI::detached(),
        };
        server.insert_api(api);
    }

    fn cleanup(&self, _server: &mut Server) {
        if let Some(store) = &self.store {
            if let Err(err) = store.flush() {
                tracing::warn!(error = %err, "final settings flush failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_are_namespaced() {
        let doc = SettingsDocument::in_memory();
        doc.set_scoped_value("a", "key", json!(1));
        doc.set_scoped_value("b", "key", json!(2));

        assert_eq!(doc.get_scoped_value("a", "key"), Some(json!(1)));
        assert_eq!(doc.get_scoped_value("b", "key"), Some(json!(2)));
        assert_eq!(doc.get_scoped_value("c", "key"), None);
    }

    #[test]
    fn get_or_falls_back_on_wrong_shape() {
        let doc = SettingsDocument::in_memory();
        doc.set_scoped_value("ns", "names", json!("not a list"));

        let names: Vec<String> = doc.get_or("ns", "names", vec!["fallback".into()]);
        assert_eq!(names, vec!["fallback".to_string()]);
    }

    #[test]
    fn clones_share_contents() {
        let doc = SettingsDocument::in_memory();
        let other = doc.clone();
        doc.set_typed("ns", "flag", &true).unwrap();
        assert!(other.get_or("ns", "flag", false));
    }

    #[test]
    fn debounce_is_shared_with_earlier_clones() {
        let doc = SettingsDocument::in_memory();
        let early = doc.clone();
        let doc = doc.with_debounce(Duration::from_millis(20));

        doc.set_typed("ns", "flag", &true).unwrap();
        assert!(early.get_or("ns", "flag", false));
        assert_eq!(early.debounce(), Duration::from_millis(20));
    }

    #[test]
    fn in_memory_schedule_save_never_writes() {
        let doc = SettingsDocument::in_memory();
        doc.schedule_save();
        assert_eq!(doc.save_count(), 0);
    }

    #[test]
    fn schedule_save_without_runtime_writes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let doc = SettingsDocument::open(&path).unwrap();

        doc.set_typed("ns", "value", &42).unwrap();
        doc.schedule_save();

        assert_eq!(doc.save_count(), 1);
        let reopened = SettingsDocument::open(&path).unwrap();
        assert_eq!(reopened.get_or("ns", "value", 0), 42);
    }

    #[test]
    fn open_rejects_non_object_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = SettingsDocument::open(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Serialization(_)));
    }

    #[test]
    fn detached_api_reports_unavailable() {
        let api = SettingsAPI::detached();
        assert!(matches!(
            api.store(),
            Err(SettingsError::PersistenceUnavailable)
        ));
    }

    #[test]
    fn store_for_without_plugin_is_none() {
        let server = Server::new();
        assert!(store_for(&server, "test").is_none());
    }
}
