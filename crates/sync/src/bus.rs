//! Process-wide invalidation signals.
//!
//! Components that show cart or wishlist state subscribe to a [`Topic`] and
//! re-read their own slice when it fires. Signals carry no payload.
//!
//! Handlers registered with [`InvalidationBus::subscribe`] run synchronously
//! inside `publish`, after the registry lock is released, so a handler may
//! itself subscribe, unsubscribe or read state. Async consumers can use
//! [`InvalidationBus::watch`] instead, which is backed by a tokio broadcast
//! channel.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Buffer for the async channel. Slow receivers lag past this many signals.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// The closed set of invalidation signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    CartChanged,
    WishlistChanged,
    CategoriesChanged,
}

impl Topic {
    pub const ALL: [Self; 3] = [
        Self::CartChanged,
        Self::WishlistChanged,
        Self::CategoriesChanged,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CartChanged => "cartChanged",
            Self::WishlistChanged => "wishlistChanged",
            Self::CategoriesChanged => "categoriesChanged",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Topic, Handler)>,
}

struct BusInner {
    registry: Mutex<Registry>,
    sender: broadcast::Sender<Topic>,
}

impl BusInner {
    fn remove(&self, id: u64) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .retain(|(hid, _, _)| *hid != id);
    }
}

/// Publish/subscribe over [`Topic`]. Clones share subscribers.
#[derive(Clone)]
pub struct InvalidationBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("handlers", &self.handler_count())
            .field("watchers", &self.inner.sender.receiver_count())
            .finish()
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InvalidationBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_BUFFER_SIZE);
        Self {
            inner: Arc::new(BusInner {
                registry: Mutex::new(Registry::default()),
                sender,
            }),
        }
    }

    /// Signal every subscriber of `topic`.
    ///
    /// Returns the number of synchronous handlers invoked.
    pub fn publish(&self, topic: Topic) -> usize {
        let handlers: Vec<Handler> = self
            .inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .map(|(_, _, h)| Arc::clone(h))
            .collect();

        for handler in &handlers {
            handler();
        }

        // No receivers is not an error.
        let watchers = self.inner.sender.send(topic).unwrap_or_default();
        trace!(topic = %topic, handlers = handlers.len(), watchers, "Published");
        handlers.len()
    }

    /// Register `handler` for `topic` until the returned [`Subscription`] is
    /// dropped or unsubscribed.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(
        &self,
        topic: Topic,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        let mut registry = self
            .inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push((id, topic, Arc::new(handler)));

        Subscription {
            id,
            topic,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Receive every published topic asynchronously.
    #[must_use]
    pub fn watch(&self) -> broadcast::Receiver<Topic> {
        self.inner.sender.subscribe()
    }

    /// Number of live synchronous handlers across all topics.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .len()
    }
}

/// Handle for a registered handler. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    topic: Topic,
    bus: Weak<BusInner>,
}

impl Subscription {
    #[must_use]
    pub const fn topic(&self) -> Topic {
        self.topic
    }

    /// Remove the handler now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_publish_reaches_only_matching_topic() {
        let bus = InvalidationBus::new();
        let (carts, on_cart) = counter();
        let (wishes, on_wish) = counter();
        let _a = bus.subscribe(Topic::CartChanged, on_cart);
        let _b = bus.subscribe(Topic::WishlistChanged, on_wish);

        assert_eq!(bus.publish(Topic::CartChanged), 1);
        assert_eq!(carts.load(Ordering::SeqCst), 1);
        assert_eq!(wishes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_multiple_subscribers_all_notified() {
        let bus = InvalidationBus::new();
        let (count, handler) = counter();
        let handler = Arc::new(handler);
        let subs: Vec<_> = (0..3)
            .map(|_| {
                let h = Arc::clone(&handler);
                bus.subscribe(Topic::CartChanged, move || h())
            })
            .collect();

        assert_eq!(bus.publish(Topic::CartChanged), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        drop(subs);
    }

    #[test]
    fn test_unsubscribe_and_drop_remove_handler() {
        let bus = InvalidationBus::new();
        let (count, handler) = counter();
        let sub = bus.subscribe(Topic::CartChanged, handler);
        sub.unsubscribe();
        {
            let _scoped = bus.subscribe(Topic::CartChanged, || {});
        }

        assert_eq!(bus.publish(Topic::CartChanged), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_handler_may_touch_bus_reentrantly() {
        let bus = InvalidationBus::new();
        let inner = bus.clone();
        let (count, handler) = counter();
        let _counting = bus.subscribe(Topic::WishlistChanged, handler);
        let _sub = bus.subscribe(Topic::CartChanged, move || {
            inner.publish(Topic::WishlistChanged);
        });

        bus.publish(Topic::CartChanged);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_watch_receives_topics() {
        let bus = InvalidationBus::new();
        let mut rx = bus.watch();

        bus.publish(Topic::CategoriesChanged);
        assert_eq!(rx.recv().await.unwrap(), Topic::CategoriesChanged);
    }

    #[test]
    fn test_topic_names() {
        let names: Vec<_> = Topic::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["cartChanged", "wishlistChanged", "categoriesChanged"]);
        assert_eq!(
            serde_json::to_string(&Topic::CategoriesChanged).unwrap(),
            r#""categoriesChanged""#
        );
    }
}
