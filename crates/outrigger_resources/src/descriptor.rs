//! Resource metadata.

use crate::injector::Handle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where a resource comes from.
///
/// Serialized as a plain string: a URL, or one of the sentinels `"bundled"`
/// and `"preloaded"` for resources the runtime already carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceSource {
    /// Fetched and injected from this URI.
    Url(String),
    /// Shipped inside the host bundle.
    Bundled,
    /// Put in place by the host before the integration starts.
    Preloaded,
}

impl ResourceSource {
    /// Whether the source names a resource that is never fetched.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Bundled | Self::Preloaded)
    }

    /// The fetch URI, for non-sentinel sources.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Bundled | Self::Preloaded => None,
        }
    }
}

impl From<&str> for ResourceSource {
    fn from(value: &str) -> Self {
        match value.trim() {
            "bundled" => Self::Bundled,
            "preloaded" => Self::Preloaded,
            url => Self::Url(url.to_owned()),
        }
    }
}

impl From<String> for ResourceSource {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<ResourceSource> for String {
    fn from(value: ResourceSource) -> Self {
        value.to_string()
    }
}

impl core::fmt::Display for ResourceSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Bundled => f.write_str("bundled"),
            Self::Preloaded => f.write_str("preloaded"),
        }
    }
}

/// How a resource is kept loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadMode {
    /// Loaded on request; consumers are tracked with acquire/release.
    #[default]
    OnDemand,
    /// Loaded at startup and kept for the process lifetime. Never tracks
    /// references.
    AlwaysOn,
}

/// Where a registered resource is in its lifecycle.
///
/// An unknown name is the implicit `Unregistered` state and is reported as
/// `None` by [`ResourceLoader::state`](crate::ResourceLoader::state). A failed
/// load returns the resource to `Registered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Known, not loaded, no load in flight.
    Registered,
    /// Exactly one load is in flight.
    Loading,
    /// The handle is available.
    Loaded,
}

/// Metadata for one registrable resource.
///
/// Descriptors are built by callers and handed to the loader; after that only
/// the loader mutates them, and readers get snapshots.
///
/// ```
/// use outrigger_resources::{LoadMode, ResourceDescriptor};
///
/// let chart = ResourceDescriptor::new(
///     "chartjs",
///     "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js",
///     "Chart",
/// )
/// .with_description("Charting library")
/// .with_mode(LoadMode::OnDemand);
///
/// assert_eq!(chart.exposed_as(), "Chart");
/// assert!(!chart.is_loaded());
/// ```
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    name: String,
    source: ResourceSource,
    exposed_as: String,
    description: Option<String>,
    mode: LoadMode,
    autoload: bool,
    requires: Vec<String>,
    handle: Option<Handle>,
    references: BTreeSet<String>,
    last_error: Option<String>,
}

impl ResourceDescriptor {
    /// Describes a resource loaded from `source` and exposed as `exposed_as`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: impl Into<ResourceSource>,
        exposed_as: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            exposed_as: exposed_as.into(),
            description: None,
            mode: LoadMode::default(),
            autoload: false,
            requires: Vec::new(),
            handle: None,
            references: BTreeSet::new(),
            last_error: None,
        }
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the load mode.
    #[must_use]
    pub fn with_mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Marks the resource for loading at startup.
    #[must_use]
    pub fn with_autoload(mut self, autoload: bool) -> Self {
        self.autoload = autoload;
        self
    }

    /// Resources that must be loaded before this one is injected, in order.
    ///
    /// Prerequisites load through the same coalesced path as any other load.
    #[must_use]
    pub fn with_requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    /// Unique registry key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the resource is loaded from.
    #[must_use]
    pub fn source(&self) -> &ResourceSource {
        &self.source
    }

    /// Name under which the loaded resource is observable.
    #[must_use]
    pub fn exposed_as(&self) -> &str {
        &self.exposed_as
    }

    /// Optional description for display.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The load mode.
    #[must_use]
    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    /// Whether the resource is flagged for loading at startup.
    #[must_use]
    pub fn autoload(&self) -> bool {
        self.autoload
    }

    /// Prerequisites, in load order.
    #[must_use]
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Whether the startup scan should load this resource.
    #[must_use]
    pub fn wants_startup_load(&self) -> bool {
        self.mode == LoadMode::AlwaysOn || self.autoload
    }

    /// Whether the handle is available.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    /// The loaded handle, if any.
    #[must_use]
    pub fn handle(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    /// Consumers currently holding the resource (on-demand mode only).
    #[must_use]
    pub fn references(&self) -> &BTreeSet<String> {
        &self.references
    }

    /// Message of the most recent failed load, cleared on success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn mark_loaded(&mut self, handle: Handle) {
        self.handle = Some(handle);
        self.last_error = None;
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.last_error = Some(message);
    }

    pub(crate) fn set_autoload(&mut self, autoload: bool) {
        self.autoload = autoload;
    }

    pub(crate) fn references_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_sources_parse() {
        assert_eq!(ResourceSource::from("bundled"), ResourceSource::Bundled);
        assert_eq!(ResourceSource::from(" preloaded "), ResourceSource::Preloaded);
        assert_eq!(
            ResourceSource::from("https://cdn.example/lib.js"),
            ResourceSource::Url("https://cdn.example/lib.js".into())
        );
        assert!(ResourceSource::Bundled.is_sentinel());
        assert_eq!(ResourceSource::Preloaded.url(), None);
    }

    #[test]
    fn sources_serialize_as_strings() {
        let json = serde_json::to_string(&ResourceSource::Bundled).unwrap();
        assert_eq!(json, "\"bundled\"");

        let parsed: ResourceSource = serde_json::from_str("\"https://x/y.js\"").unwrap();
        assert_eq!(parsed.url(), Some("https://x/y.js"));
    }

    #[test]
    fn new_descriptor_defaults() {
        let descriptor = ResourceDescriptor::new("axios", "https://x/axios.js", "axios");
        assert_eq!(descriptor.mode(), LoadMode::OnDemand);
        assert!(!descriptor.autoload());
        assert!(!descriptor.wants_startup_load());
        assert!(descriptor.references().is_empty());
        assert!(descriptor.description().is_none());
        assert!(descriptor.requires().is_empty());
    }

    #[test]
    fn prerequisites_keep_their_order() {
        let descriptor = ResourceDescriptor::new("react-dom", "https://x/react-dom.js", "ReactDOM")
            .with_requires(["react", "scheduler"]);
        assert_eq!(descriptor.requires(), ["react", "scheduler"]);
    }

    #[test]
    fn always_on_wants_startup_load() {
        let descriptor = ResourceDescriptor::new("vue", "https://x/vue.js", "Vue")
            .with_mode(LoadMode::AlwaysOn);
        assert!(descriptor.wants_startup_load());
    }

    #[test]
    fn loading_clears_last_error() {
        let mut descriptor = ResourceDescriptor::new("dayjs", "https://x/dayjs.js", "dayjs");
        descriptor.record_failure("offline".into());
        assert_eq!(descriptor.last_error(), Some("offline"));

        descriptor.mark_loaded(Handle::new("dayjs"));
        assert!(descriptor.is_loaded());
        assert!(descriptor.last_error().is_none());
    }
}
