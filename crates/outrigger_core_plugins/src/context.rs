//! Context provider and change notifications.
//!
//! The host owns the notion of "current context" (the selected character or
//! session). [`ContextAPI`] mirrors it for the rest of the integration and
//! broadcasts [`ContextEvent`]s so dependent UI can re-resolve add-on
//! activation. Nothing in the core requires a subscriber: activation is
//! always evaluated on demand.

use outrigger_system::api::API;
use outrigger_system::plugin::Plugin;
use outrigger_system::server::Server;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

/// A change that may affect which add-ons are active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    /// The host switched to a different context.
    Changed {
        /// The context before the switch.
        previous: Option<String>,
        /// The context after the switch.
        current: Option<String>,
    },
    /// The context is unchanged but decisions should be re-evaluated
    /// (e.g. after a scope binding was edited).
    Reloaded {
        /// The context at the time of the reload.
        current: Option<String>,
    },
}

/// Current context identifier plus a broadcast channel for changes.
///
/// Cloning is cheap; clones observe and publish on the same state.
#[derive(Clone)]
pub struct ContextAPI {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    current: RwLock<Option<String>>,
    events: broadcast::Sender<ContextEvent>,
}

impl API for ContextAPI {}

impl Default for ContextAPI {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ContextAPI {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContextAPI")
            .field("current", &*self.inner.current.read())
            .field("subscribers", &self.inner.events.receiver_count())
            .finish()
    }
}

impl ContextAPI {
    /// Creates a provider with no active context.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ContextInner {
                current: RwLock::new(None),
                events,
            }),
        }
    }

    /// The active context identifier, if any.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.inner.current.read().clone()
    }

    /// Switches the active context.
    ///
    /// Emits [`ContextEvent::Changed`] only when the identifier actually
    /// changes. Returns whether it did.
    pub fn set_current(&self, context: Option<impl Into<String>>) -> bool {
        let context = context.map(Into::into);
        let previous = {
            let mut current = self.inner.current.write();
            if *current == context {
                return false;
            }
            core::mem::replace(&mut *current, context.clone())
        };

        tracing::debug!(?previous, current = ?context, "context changed");
        self.publish(ContextEvent::Changed {
            previous,
            current: context,
        });
        true
    }

    /// Asks subscribers to re-evaluate decisions for the current context.
    pub fn reload(&self) {
        self.publish(ContextEvent::Reloaded {
            current: self.current(),
        });
    }

    /// Subscribes to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.inner.events.subscribe()
    }

    fn publish(&self, event: ContextEvent) {
        // No subscribers is the normal headless case.
        if self.inner.events.send(event).is_err() {
            tracing::trace!("context event dropped, no subscribers");
        }
    }
}

/// Plugin that installs the [`ContextAPI`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextPlugin;

impl Plugin for ContextPlugin {
    fn build(&self, server: &mut Server) {
        if !server.contains_api::<ContextAPI>() {
            server.insert_api(ContextAPI::new());
        }
    }
}
