//! The commerce state synchronizer.
//!
//! Every cart and wishlist operation walks the same ladder:
//!
//! 1. validate (the only step that can fail the call),
//! 2. if a shopper is signed in, write to the remote store,
//! 3. update the local mirror (from the remote's answer, or by merging
//!    locally when the remote was skipped or failed),
//! 4. publish exactly one invalidation signal.
//!
//! Failures in steps 2 and 3 are logged and returned as notices in the
//! [`SyncReport`](crate::SyncReport).

mod cart;
mod wishlist;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use np_commerce_core::{Identity, UserId};
use secrecy::SecretString;
use tracing::{info, warn};

pub use cart::AddToCart;

use crate::bus::{InvalidationBus, Topic};
use crate::catalog::{Catalog, ReadThroughCache};
use crate::config::SyncOptions;
use crate::remote::{CommerceApi, RemoteCall, RemoteError};
use crate::store::{LocalMirror, LocalStore};

/// Orchestrates cart and wishlist state across the remote store and the
/// local mirror. Cheap to clone; clones share identity and state.
#[derive(Debug, Clone)]
pub struct Synchronizer<R> {
    api: CommerceApi<R>,
    catalog: Catalog<R>,
    mirror: LocalMirror,
    bus: InvalidationBus,
    identity: Arc<RwLock<Identity>>,
    /// Shopper whose remote cart clear failed. Their remote still holds lines
    /// they already discarded, so it must be cleared before it is trusted.
    /// Survives sign-out; other shoppers never trigger it.
    remote_clear_pending: Arc<Mutex<Option<UserId>>>,
}

impl<R: RemoteCall + Clone> Synchronizer<R> {
    /// Create an anonymous synchronizer.
    pub fn new(
        remote: R,
        store: Arc<dyn LocalStore>,
        bus: InvalidationBus,
        options: &SyncOptions,
    ) -> Self {
        let api = CommerceApi::new(remote, options.remote_timeout);
        let cache = ReadThroughCache::new(options.catalog_ttl, options.catalog_capacity);
        let catalog = Catalog::new(api.clone(), cache, bus.clone());

        Self {
            api,
            catalog,
            mirror: LocalMirror::new(store, &options.namespace),
            bus,
            identity: Arc::new(RwLock::new(Identity::Anonymous)),
            remote_clear_pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Builder-style initial identity. Publishes nothing.
    #[must_use]
    pub fn with_identity(self, identity: Identity) -> Self {
        *self.identity.write().unwrap_or_else(PoisonError::into_inner) = identity;
        self
    }
}

impl<R: RemoteCall> Synchronizer<R> {
    pub const fn catalog(&self) -> &Catalog<R> {
        &self.catalog
    }

    pub const fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }

    pub const fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    /// The shopper operations currently act for.
    pub fn identity(&self) -> Identity {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Switch shopper. Nothing is cleared or merged; subscribers are told to
    /// re-read because their slice may now come from a different tier.
    pub fn set_identity(&self, identity: Identity) {
        info!(
            authenticated = identity.is_authenticated(),
            user_id = ?identity.user_id(),
            "Identity changed"
        );
        *self.identity.write().unwrap_or_else(PoisonError::into_inner) = identity;
        self.publish(Topic::CartChanged);
        self.publish(Topic::WishlistChanged);
    }

    /// Access token of the current identity, if signed in.
    fn token(&self) -> Option<SecretString> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token()
            .cloned()
    }

    /// Finish a remote cart clear that failed earlier, before anything else
    /// touches the remote cart.
    async fn settle_remote_cart(&self, token: &SecretString) -> Result<(), RemoteError> {
        let shopper = self.identity().user_id();
        let due = shopper.is_some() && *self.pending_clear() == shopper;
        if !due {
            return Ok(());
        }
        self.api.clear_cart(token).await?;
        self.settle_pending_clear(shopper);
        info!("Completed pending remote cart clear");
        Ok(())
    }

    fn pending_clear(&self) -> MutexGuard<'_, Option<UserId>> {
        self.remote_clear_pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the pending clear if it belongs to `shopper`.
    fn settle_pending_clear(&self, shopper: Option<UserId>) {
        let mut pending = self.pending_clear();
        if *pending == shopper {
            *pending = None;
        }
    }

    fn publish(&self, topic: Topic) {
        self.bus.publish(topic);
    }
}

/// Log a remote failure that the local tier is about to absorb.
fn degraded(operation: &'static str, error: &RemoteError) -> String {
    warn!(operation, error = %error, "Remote store unreachable, using local mirror");
    error.to_string()
}
