//! A stand-in for the host's script runtime.

use async_trait::async_trait;
use outrigger_resources::{Handle, InjectError, Injector, ResourceSource};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::time::Duration;

/// Pretends to fetch and evaluate scripts.
///
/// Every injection takes `latency`. URLs on hosts listed with
/// [`with_unreachable_host`](Self::with_unreachable_host) fail to fetch, and
/// anything that is not `https` fails to evaluate.
pub struct SimulatedRuntime {
    globals: RwLock<BTreeSet<String>>,
    unreachable: Vec<String>,
    latency: Duration,
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl SimulatedRuntime {
    /// A runtime whose injections take `latency`.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self {
            globals: RwLock::new(BTreeSet::new()),
            unreachable: Vec::new(),
            latency,
        }
    }

    /// Globals the host put in place before startup.
    #[must_use]
    pub fn with_global(self, name: &str) -> Self {
        self.globals.write().insert(name.to_owned());
        self
    }

    /// Makes every URL on `host` fail to fetch.
    #[must_use]
    pub fn with_unreachable_host(mut self, host: &str) -> Self {
        self.unreachable.push(host.to_owned());
        self
    }

    /// Names currently exposed.
    #[must_use]
    pub fn globals(&self) -> Vec<String> {
        self.globals.read().iter().cloned().collect()
    }
}

#[async_trait]
impl Injector for SimulatedRuntime {
    async fn inject(
        &self,
        source: &ResourceSource,
        exposed_as: &str,
    ) -> Result<Handle, InjectError> {
        let url = source
            .url()
            .ok_or_else(|| InjectError::NotExposed(exposed_as.to_owned()))?;
        tracing::debug!(url, "fetching");
        tokio::time::sleep(self.latency).await;

        let Some(rest) = url.strip_prefix("https://") else {
            return Err(InjectError::Execution(format!("refusing insecure script {url}")));
        };
        let host = rest.split('/').next().unwrap_or_default();
        if self.unreachable.iter().any(|blocked| blocked == host) {
            return Err(InjectError::Fetch(format!("{host} is unreachable")));
        }

        self.globals.write().insert(exposed_as.to_owned());
        Ok(Handle::new(exposed_as))
    }

    fn lookup(&self, exposed_as: &str) -> Option<Handle> {
        self.globals
            .read()
            .contains(exposed_as)
            .then(|| Handle::new(exposed_as))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn injection_exposes_the_global() {
        let runtime = SimulatedRuntime::default();
        let source = ResourceSource::from("https://cdn.example/chart.js");

        let handle = runtime.inject(&source, "Chart").await.unwrap();
        assert_eq!(handle.exposed_as(), "Chart");
        assert!(runtime.lookup("Chart").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_hosts_fail_to_fetch() {
        let runtime = SimulatedRuntime::default().with_unreachable_host("cdn.example");
        let source = ResourceSource::from("https://cdn.example/chart.js");

        let err = runtime.inject(&source, "Chart").await.unwrap_err();
        assert!(matches!(err, InjectError::Fetch(_)));
        assert!(runtime.lookup("Chart").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn insecure_scripts_fail_to_execute() {
        let runtime = SimulatedRuntime::default();
        let source = ResourceSource::from("http://cdn.example/chart.js");
        let err = runtime.inject(&source, "Chart").await.unwrap_err();
        assert!(matches!(err, InjectError::Execution(_)));
    }
}
