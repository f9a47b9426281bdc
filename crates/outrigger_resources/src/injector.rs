//! The seam between the loader and the host runtime.
//!
//! The loader never fetches or evaluates anything itself. It hands a
//! [`ResourceSource`] to an [`Injector`], which puts the resource into the
//! runtime and reports back a [`Handle`]. [`Injector::lookup`] answers whether
//! something is already exposed, which covers sentinel sources and resources
//! the host loaded before registration.

use crate::descriptor::ResourceSource;
use async_trait::async_trait;
use std::sync::Arc;

/// Reference to a resource that is live in the runtime.
///
/// Handles compare by the name they are exposed under, so every caller that
/// observes the same load sees an equal handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    exposed_as: Arc<str>,
}

impl Handle {
    /// Creates a handle for a resource exposed as `exposed_as`.
    #[must_use]
    pub fn new(exposed_as: impl AsRef<str>) -> Self {
        Self {
            exposed_as: Arc::from(exposed_as.as_ref()),
        }
    }

    /// The runtime name the resource is reachable under.
    #[must_use]
    pub fn exposed_as(&self) -> &str {
        &self.exposed_as
    }
}

impl core::fmt::Display for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.exposed_as)
    }
}

/// Why an injection failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectError {
    /// The source could not be retrieved.
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// The source was retrieved but failed to evaluate.
    #[error("execution failed: {0}")]
    Execution(String),
    /// Evaluation succeeded but nothing appeared under the expected name.
    #[error("nothing exposed as '{0}'")]
    NotExposed(String),
}

/// Puts resources into the host runtime.
///
/// Implementations must be idempotent per `exposed_as`: the loader calls
/// [`inject`](Injector::inject) at most once per load attempt, but a resource
/// that was injected by someone else should still be reported by
/// [`lookup`](Injector::lookup).
#[async_trait]
pub trait Injector: Send + Sync + 'static {
    /// Fetches and evaluates `source`, resolving once the resource is
    /// reachable as `exposed_as`.
    async fn inject(&self, source: &ResourceSource, exposed_as: &str)
    -> Result<Handle, InjectError>;

    /// Returns a handle if something is already exposed as `exposed_as`.
    fn lookup(&self, exposed_as: &str) -> Option<Handle>;
}
