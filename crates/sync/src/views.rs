//! Derived state recomputed on invalidation.
//!
//! A [`CountBadge`] is what a header icon shows: it keeps no state of its own
//! beyond the last computed number, and recomputes from the local mirror
//! whenever its topic fires.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bus::{InvalidationBus, Subscription, Topic};
use crate::remote::RemoteCall;
use crate::synchronizer::Synchronizer;

/// A count kept current by an invalidation topic.
#[derive(Debug)]
pub struct CountBadge {
    count: Arc<AtomicU64>,
    _subscription: Subscription,
}

impl CountBadge {
    /// Subscribe `recompute` to `topic`. The count is computed once up front.
    pub fn new(
        bus: &InvalidationBus,
        topic: Topic,
        recompute: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Self {
        let count = Arc::new(AtomicU64::new(recompute()));
        let slot = Arc::clone(&count);
        let subscription = bus.subscribe(topic, move || {
            slot.store(recompute(), Ordering::SeqCst);
        });
        Self {
            count,
            _subscription: subscription,
        }
    }

    /// Total quantity across cart lines.
    pub fn cart<R: RemoteCall>(sync: &Synchronizer<R>) -> Self {
        let mirror = sync.mirror().clone();
        Self::new(sync.bus(), Topic::CartChanged, move || {
            mirror.load_cart().value.total_quantity()
        })
    }

    /// Number of wishlisted products.
    pub fn wishlist<R: RemoteCall>(sync: &Synchronizer<R>) -> Self {
        let mirror = sync.mirror().clone();
        Self::new(sync.bus(), Topic::WishlistChanged, move || {
            u64::try_from(mirror.load_wishlist().value.len()).unwrap_or(u64::MAX)
        })
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}
