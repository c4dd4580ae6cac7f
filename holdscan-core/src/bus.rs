//! Invalidation fan-out between caches and interested host components.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use log::warn;

/// Data families whose cached values can be invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Photos,
    Routes,
    DetectedHolds,
}

/// Callback invoked when a topic is invalidated.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

type Registry = Mutex<HashMap<Topic, Vec<Listener>>>;

/// Synchronous fan-out of cache invalidation events.
///
/// Clones share one listener registry. Delivery runs on the caller's thread
/// against a snapshot taken under the lock, so listeners may subscribe or
/// unsubscribe (including themselves) during delivery without deadlocking.
#[derive(Clone, Default)]
pub struct CacheEventBus {
    inner: Arc<Registry>,
}

impl CacheEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one topic.
    ///
    /// Subscribing the same `Listener` allocation to the same topic twice is
    /// a no-op; it still gets delivered once per invalidation.
    pub fn subscribe(&self, topic: Topic, listener: Listener) -> Subscription {
        let mut registry = self.inner.lock().expect("listener registry poisoned");
        let listeners = registry.entry(topic).or_default();
        if !listeners
            .iter()
            .any(|existing| Arc::ptr_eq(existing, &listener))
        {
            listeners.push(listener.clone());
        }
        Subscription {
            registry: Arc::downgrade(&self.inner),
            topic,
            listener,
        }
    }

    /// Register a closure for one topic.
    pub fn subscribe_fn(
        &self,
        topic: Topic,
        listener: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(topic, Arc::new(listener))
    }

    /// Deliver an invalidation for `topic` to every currently subscribed
    /// listener.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    pub fn invalidate(&self, topic: Topic) {
        let snapshot: Vec<Listener> = {
            let registry = self.inner.lock().expect("listener registry poisoned");
            registry.get(&topic).cloned().unwrap_or_default()
        };
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                warn!("cache invalidation listener panicked for {topic:?}");
            }
        }
    }
}

/// Handle tying a registered listener to its bus.
///
/// Dropping the handle does not unsubscribe; removal is always explicit.
#[must_use = "call unsubscribe() to remove the listener; dropping the handle leaves it registered"]
pub struct Subscription {
    registry: Weak<Registry>,
    topic: Topic,
    listener: Listener,
}

impl Subscription {
    /// Remove this subscription's listener from the bus.
    ///
    /// Does nothing if the bus has already been dropped.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().expect("listener registry poisoned");
            if let Some(listeners) = registry.get_mut(&self.topic) {
                listeners.retain(|existing| !Arc::ptr_eq(existing, &self.listener));
            }
        }
    }
}
