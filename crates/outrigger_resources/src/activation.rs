//! Per-consumer reference tracking for on-demand resources.
//!
//! Add-ons [`acquire`](ResourceLoader::acquire) the resources they need and
//! [`release`](ResourceLoader::release) them when they stop. References are
//! advisory: a resource whose last consumer leaves is reported as idle but
//! stays loaded.

use crate::descriptor::LoadMode;
use crate::error::ResourceError;
use crate::injector::Handle;
use crate::loader::ResourceLoader;
use std::collections::BTreeSet;

/// Outcome of [`ResourceLoader::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Other consumers still hold the resource.
    Held {
        /// How many consumers remain.
        remaining: usize,
    },
    /// The last consumer left. The resource stays loaded.
    Idle,
    /// The consumer held no reference, or the resource is always-on.
    NotHeld,
}

impl ResourceLoader {
    /// Records `consumer` as a user of `name` and loads it.
    ///
    /// Always-on resources are loaded without tracking. If the load fails the
    /// reference added by this call is rolled back.
    pub async fn acquire(&self, name: &str, consumer: &str) -> Result<Handle, ResourceError> {
        let tracked = {
            let mut state = self.core.state.lock();
            let descriptor = state.descriptor_mut(name)?;
            match descriptor.mode() {
                LoadMode::AlwaysOn => false,
                LoadMode::OnDemand => {
                    let added = descriptor.references_mut().insert(consumer.to_owned());
                    tracing::debug!(
                        resource = name,
                        consumer,
                        references = descriptor.references().len(),
                        "acquired"
                    );
                    added
                }
            }
        };

        let result = self.load(name).await;
        if result.is_err() && tracked {
            let mut state = self.core.state.lock();
            if let Ok(descriptor) = state.descriptor_mut(name) {
                descriptor.references_mut().remove(consumer);
            }
            tracing::debug!(resource = name, consumer, "acquire rolled back");
        }
        result
    }

    /// Drops `consumer`'s reference to `name`.
    pub fn release(&self, name: &str, consumer: &str) -> Result<Release, ResourceError> {
        let mut state = self.core.state.lock();
        let descriptor = state.descriptor_mut(name)?;
        if descriptor.mode() == LoadMode::AlwaysOn || !descriptor.references_mut().remove(consumer)
        {
            return Ok(Release::NotHeld);
        }

        let remaining = descriptor.references().len();
        tracing::debug!(resource = name, consumer, remaining, "released");
        if remaining == 0 {
            tracing::debug!(resource = name, "resource idle, keeping it loaded");
            Ok(Release::Idle)
        } else {
            Ok(Release::Held { remaining })
        }
    }

    /// Consumers currently holding `name`, or `None` for an unknown name.
    #[must_use]
    pub fn references(&self, name: &str) -> Option<BTreeSet<String>> {
        self.core
            .state
            .lock()
            .descriptors
            .get(name)
            .map(|descriptor| descriptor.references().clone())
    }

    /// Loaded on-demand resources that no consumer holds.
    #[must_use]
    pub fn idle_resources(&self) -> Vec<String> {
        self.core
            .state
            .lock()
            .descriptors
            .values()
            .filter(|descriptor| {
                descriptor.mode() == LoadMode::OnDemand
                    && descriptor.is_loaded()
                    && descriptor.references().is_empty()
            })
            .map(|descriptor| descriptor.name().to_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ResourceDescriptor;
    use crate::mock::MockInjector;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Records the level of every event.
    #[derive(Clone, Default)]
    struct Levels(Arc<Mutex<Vec<Level>>>);

    impl<S: Subscriber> Layer<S> for Levels {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().push(*event.metadata().level());
        }
    }

    #[tokio::test]
    async fn going_idle_is_reported_at_debug() {
        let loader = ResourceLoader::builder(Arc::new(MockInjector::new()))
            .without_builtins()
            .resource(ResourceDescriptor::new("chartjs", "https://x/chart.js", "Chart"))
            .build();
        loader.acquire("chartjs", "panelA").await.unwrap();

        let levels = Levels::default();
        let subscriber = tracing_subscriber::registry().with(levels.clone());
        let release = tracing::subscriber::with_default(subscriber, || {
            loader.release("chartjs", "panelA")
        });

        assert_eq!(release, Ok(Release::Idle));
        let levels = levels.0.lock();
        assert!(!levels.is_empty());
        assert!(
            levels
                .iter()
                .all(|level| matches!(*level, Level::DEBUG | Level::TRACE))
        );
    }
}
