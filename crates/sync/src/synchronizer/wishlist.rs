//! Wishlist operations. Same two-tier pattern as the cart, without variants.

use np_commerce_core::{ProductId, Wishlist};
use tracing::{debug, instrument};

use super::{Synchronizer, degraded};
use crate::bus::Topic;
use crate::error::{Fetched, StoreTier, SyncReport, WishlistError, WishlistResult};
use crate::remote::{RemoteCall, RemoteError};

impl<R: RemoteCall> Synchronizer<R> {
    /// The shopper's wishlist from the best tier available.
    #[instrument(skip(self))]
    pub async fn wishlist(&self) -> Fetched<Wishlist, WishlistError> {
        let mut notices = Vec::new();

        if let Some(token) = self.token() {
            match self.api.fetch_wishlist(&token).await {
                Ok(wishlist) => {
                    self.mirror.save_wishlist(&wishlist);
                    return Fetched {
                        value: wishlist,
                        tier: StoreTier::Remote,
                        notices,
                    };
                }
                Err(e) => notices.push(WishlistError::RemoteUnreachable(degraded("wishlist", &e))),
            }
        }

        let loaded = self.mirror.load_wishlist();
        notices.extend(loaded.malformed.map(WishlistError::MalformedCache));
        Fetched {
            value: loaded.value,
            tier: StoreTier::LocalCache,
            notices,
        }
    }

    /// Membership check against the local mirror. Never suspends.
    pub fn is_in_wishlist(&self, product_id: ProductId) -> bool {
        self.mirror.load_wishlist().value.contains(product_id)
    }

    /// Add a product. Adding a present product is a successful no-op.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the wishlist API uniform.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_wishlist(&self, product_id: ProductId) -> WishlistResult {
        let result = match self.token() {
            Some(token) => Some(self.api.add_to_wishlist(&token, product_id).await),
            None => None,
        };
        Ok(self.finish(result, "add_to_wishlist", |wishlist| {
            wishlist.insert(product_id)
        }))
    }

    /// Remove a product. Removing an absent product is a successful no-op.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the wishlist API uniform.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_wishlist(&self, product_id: ProductId) -> WishlistResult {
        let result = match self.token() {
            Some(token) => Some(self.api.remove_from_wishlist(&token, product_id).await),
            None => None,
        };
        Ok(self.finish(result, "remove_from_wishlist", |wishlist| {
            wishlist.remove(product_id)
        }))
    }

    /// Add the product if absent, remove it if present.
    ///
    /// Membership is decided from the local mirror, which is what every
    /// heart icon on screen is showing.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the wishlist API uniform.
    pub async fn toggle_wishlist(&self, product_id: ProductId) -> WishlistResult {
        if self.is_in_wishlist(product_id) {
            self.remove_from_wishlist(product_id).await
        } else {
            self.add_to_wishlist(product_id).await
        }
    }

    /// Apply a membership change to the mirror and publish. `remote` is
    /// `None` when no remote write was attempted.
    fn finish(
        &self,
        remote: Option<Result<(), RemoteError>>,
        operation: &'static str,
        apply: impl FnOnce(&mut Wishlist) -> bool,
    ) -> SyncReport<WishlistError> {
        let mut notices = Vec::new();
        let tier = match remote {
            Some(Ok(())) => StoreTier::Remote,
            Some(Err(e)) => {
                notices.push(WishlistError::RemoteUnreachable(degraded(operation, &e)));
                StoreTier::LocalCache
            }
            None => StoreTier::LocalCache,
        };

        let loaded = self.mirror.update_wishlist(apply);
        notices.extend(loaded.malformed.map(WishlistError::MalformedCache));
        if !loaded.value {
            debug!(operation, "Wishlist membership unchanged");
        }

        self.publish(Topic::WishlistChanged);
        SyncReport::new(tier).with_notices(notices)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::remote::Method;
    use crate::store::LocalStore;
    use crate::synchronizer::tests::{harness, signed_in};

    #[tokio::test]
    async fn test_membership_is_idempotent() {
        let (_, _, sync) = harness();
        let id = ProductId::new(3);

        sync.add_to_wishlist(id).await.unwrap();
        sync.add_to_wishlist(id).await.unwrap();
        assert!(sync.is_in_wishlist(id));
        assert_eq!(sync.wishlist().await.value.len(), 1);

        sync.remove_from_wishlist(id).await.unwrap();
        let report = sync.remove_from_wishlist(id).await.unwrap();
        assert!(report.is_clean());
        assert!(!sync.is_in_wishlist(id));
    }

    #[tokio::test]
    async fn test_each_mutation_publishes_once() {
        let (_, _, sync) = harness();
        let mut rx = sync.bus().watch();

        sync.add_to_wishlist(ProductId::new(1)).await.unwrap();
        sync.remove_from_wishlist(ProductId::new(2)).await.unwrap();

        assert_eq!(rx.try_recv().unwrap(), Topic::WishlistChanged);
        assert_eq!(rx.try_recv().unwrap(), Topic::WishlistChanged);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_toggle_flips_membership() {
        let (_, _, sync) = harness();
        let id = ProductId::new(8);

        sync.toggle_wishlist(id).await.unwrap();
        assert!(sync.is_in_wishlist(id));
        sync.toggle_wishlist(id).await.unwrap();
        assert!(!sync.is_in_wishlist(id));
    }

    #[tokio::test]
    async fn test_remote_failure_still_updates_mirror() {
        let (remote, _, sync) = harness();
        let sync = sync.with_identity(signed_in());
        remote.reply(Err("offline"));

        let report = sync.add_to_wishlist(ProductId::new(4)).await.unwrap();

        assert_eq!(report.tier, StoreTier::LocalCache);
        assert!(matches!(report.notices[..], [WishlistError::RemoteUnreachable(_)]));
        assert!(sync.is_in_wishlist(ProductId::new(4)));
        assert_eq!(remote.calls(), vec![(Method::Post, "wishlist/".to_string())]);
    }

    #[tokio::test]
    async fn test_authenticated_read_mirrors_remote() {
        let (remote, store, sync) = harness();
        let sync = sync.with_identity(signed_in());
        remote.reply(Ok(json!([{"productId": 5}, 6])));

        let fetched = sync.wishlist().await;

        assert_eq!(fetched.tier, StoreTier::Remote);
        assert!(sync.is_in_wishlist(ProductId::new(6)));
        assert_eq!(
            store.get("np:wishlist").as_deref(),
            Some(r#"[{"productId":5},{"productId":6}]"#)
        );
    }

    #[tokio::test]
    async fn test_malformed_wishlist_reported() {
        let (_, store, sync) = harness();
        store.set("np:wishlist", "{not json");

        let report = sync.add_to_wishlist(ProductId::new(1)).await.unwrap();

        assert!(matches!(report.notices[..], [WishlistError::MalformedCache(_)]));
        assert_eq!(sync.wishlist().await.value.len(), 1);
    }
}
