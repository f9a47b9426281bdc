//! Scriptable injector for tests.

use crate::descriptor::ResourceSource;
use crate::injector::{Handle, InjectError, Injector};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::watch;

/// In-memory [`Injector`] that records calls and can be made to fail or
/// block.
///
/// Successful injections mark the name as present, so
/// [`lookup`](Injector::lookup) behaves like a runtime that keeps what it
/// evaluated.
pub struct MockInjector {
    present: Mutex<HashSet<String>>,
    injections: Mutex<HashMap<String, usize>>,
    failures: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    gate: watch::Sender<bool>,
}

impl Default for MockInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInjector {
    /// Injects immediately and always succeeds.
    #[must_use]
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            present: Mutex::new(HashSet::new()),
            injections: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            delay: None,
            gate,
        }
    }

    /// Holds every injection until [`open_gate`](Self::open_gate) is called.
    #[must_use]
    pub fn gated() -> Self {
        let injector = Self::new();
        injector.gate.send_replace(false);
        injector
    }

    /// Takes `delay` (on the Tokio clock) for every injection.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Releases injections held by [`gated`](Self::gated).
    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    /// Pretends the host already exposes `exposed_as`.
    pub fn mark_present(&self, exposed_as: &str) {
        self.present.lock().insert(exposed_as.to_owned());
    }

    /// Makes the next `times` injections of `exposed_as` fail.
    pub fn fail_next(&self, exposed_as: &str, times: usize) {
        *self
            .failures
            .lock()
            .entry(exposed_as.to_owned())
            .or_default() += times;
    }

    /// How many times `exposed_as` was injected.
    #[must_use]
    pub fn injections(&self, exposed_as: &str) -> usize {
        self.injections.lock().get(exposed_as).copied().unwrap_or(0)
    }

    /// Injections across all names.
    #[must_use]
    pub fn total_injections(&self) -> usize {
        self.injections.lock().values().sum()
    }

    fn take_failure(&self, exposed_as: &str) -> bool {
        let mut failures = self.failures.lock();
        match failures.get_mut(exposed_as) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl Injector for MockInjector {
    async fn inject(
        &self,
        source: &ResourceSource,
        exposed_as: &str,
    ) -> Result<Handle, InjectError> {
        *self
            .injections
            .lock()
            .entry(exposed_as.to_owned())
            .or_default() += 1;

        let mut gate = self.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err(InjectError::Execution("injector dropped".into()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.take_failure(exposed_as) {
            return Err(InjectError::Fetch(format!("scripted failure for {source}")));
        }
        self.mark_present(exposed_as);
        Ok(Handle::new(exposed_as))
    }

    fn lookup(&self, exposed_as: &str) -> Option<Handle> {
        self.present
            .lock()
            .contains(exposed_as)
            .then(|| Handle::new(exposed_as))
    }
}
