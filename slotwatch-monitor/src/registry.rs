//! Subscriber registry for metrics updates.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotwatch_types::NetworkMetrics;
use tracing::error;

/// Callback invoked with each new snapshot.
pub type Callback = Arc<dyn Fn(&NetworkMetrics) + Send + Sync>;

/// Identifies one registration in a [`SubscriberRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    callbacks: Mutex<BTreeMap<SubscriptionId, Callback>>,
}

/// Set of callbacks notified after every successful poll cycle.
///
/// Ids are handed out in increasing order, so notification follows
/// registration order. Callbacks are invoked outside the lock: a callback
/// may subscribe or unsubscribe (itself included) while being notified.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<Inner>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`. Each call creates an independent registration,
    /// even when the same closure is registered twice.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&NetworkMetrics) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.callbacks.lock().insert(id, Arc::new(callback));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.callbacks.lock().remove(&id).is_some()
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.inner.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every registered callback once with `metrics`.
    ///
    /// A panicking callback is logged and skipped. Returns how many callbacks
    /// completed normally.
    pub fn notify(&self, metrics: &NetworkMetrics) -> usize {
        let callbacks: Vec<(SubscriptionId, Callback)> = self
            .inner
            .callbacks
            .lock()
            .iter()
            .map(|(id, cb)| (*id, cb.clone()))
            .collect();

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(metrics))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(
                        subscription = %id,
                        panic = panic_message(payload.as_ref()),
                        "Subscriber panicked during notification"
                    );
                }
            }
        }
        delivered
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

/// Handle for one registration.
///
/// Dropping the handle does not unsubscribe; call [`unsubscribe`](Self::unsubscribe).
/// The handle does not keep the registry alive.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<Inner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop receiving updates. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.registry.upgrade() {
            inner.callbacks.lock().remove(&self.id);
        }
    }

    /// Whether this registration is still present.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|inner| inner.callbacks.lock().contains_key(&self.id))
    }
}
