//! Subscriber-based notifications for module reloads.

use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// What happened to a module during a reload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEventKind {
    /// The module was re-executed and its exports rebound.
    Reloaded,
    /// Re-execution failed; the module keeps its previous exports.
    Failed(String),
}

/// A reload attempt for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    /// The module that was reloaded
    pub identity: String,
    /// The result of the attempt
    pub kind: ReloadEventKind,
}

type Callback = Box<dyn Fn(&ReloadEvent) + Send + Sync>;

/// Internal subscriber registry state.
struct SubscribersInner {
    subscribers: Vec<(usize, Callback)>,
    next_id: usize,
}

/// Handle for a subscription that can be dropped to unsubscribe.
///
/// When the handle is dropped, the subscription is removed immediately.
pub struct SubscriptionHandle {
    id: usize,
    registry: Weak<RwLock<SubscribersInner>>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.write().subscribers.retain(|(sub_id, _)| *sub_id != self.id);
        }
    }
}

/// Registry of callbacks invoked after each reload attempt.
///
/// # Examples
///
/// ```rust
/// use hotswap_modules::notify::{ReloadEvent, ReloadEventKind, ReloadSubscribers};
///
/// let subscribers = ReloadSubscribers::new();
/// let handle = subscribers.subscribe(|event| {
///     println!("{} reloaded: {:?}", event.identity, event.kind);
/// });
///
/// subscribers.notify_all(&ReloadEvent {
///     identity: "pkg.mod".to_string(),
///     kind: ReloadEventKind::Reloaded,
/// });
///
/// // Unsubscribe by dropping the handle
/// drop(handle);
/// assert_eq!(subscribers.subscriber_count(), 0);
/// ```
pub struct ReloadSubscribers {
    inner: Arc<RwLock<SubscribersInner>>,
}

impl ReloadSubscribers {
    /// Create a registry with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SubscribersInner {
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a callback. Returns a handle that unsubscribes when dropped.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ReloadEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Box::new(callback)));

        SubscriptionHandle {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Call every subscriber, in subscription order.
    ///
    /// Callbacks must not subscribe or unsubscribe from within the callback.
    pub fn notify_all(&self, event: &ReloadEvent) {
        let inner = self.inner.read();
        for (_id, callback) in &inner.subscribers {
            callback(event);
        }
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.read().subscribers.len()
    }
}

impl Default for ReloadSubscribers {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ReloadSubscribers {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
