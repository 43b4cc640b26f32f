//! Integration tests for wishlist synchronization.

use np_commerce_core::ProductId;
use np_commerce_integration_tests::{Harness, WISHLIST_KEY};
use np_commerce_sync::{LocalStore, StoreTier, Topic, WishlistError};

const SCARF: ProductId = ProductId::new(11);

#[tokio::test]
async fn test_add_is_idempotent() {
    let h = Harness::new();

    h.sync.add_to_wishlist(SCARF).await.unwrap();
    h.sync.add_to_wishlist(SCARF).await.unwrap();

    let wishlist = h.sync.wishlist().await.into_value();
    assert_eq!(wishlist.len(), 1);
    assert!(h.sync.is_in_wishlist(SCARF));
}

#[tokio::test]
async fn test_removing_absent_entry_is_noop() {
    let h = Harness::new();
    let mut rx = h.sync.bus().watch();

    let report = h.sync.remove_from_wishlist(SCARF).await.unwrap();

    assert!(report.is_clean());
    assert!(!h.sync.is_in_wishlist(SCARF));
    assert_eq!(rx.try_recv().unwrap(), Topic::WishlistChanged);
}

#[tokio::test]
async fn test_toggle_flips_membership() {
    let h = Harness::new();

    h.sync.toggle_wishlist(SCARF).await.unwrap();
    assert!(h.sync.is_in_wishlist(SCARF));

    h.sync.toggle_wishlist(SCARF).await.unwrap();
    assert!(!h.sync.is_in_wishlist(SCARF));
}

#[tokio::test]
async fn test_signed_in_writes_reach_remote() {
    let h = Harness::signed_in();

    let added = h.sync.add_to_wishlist(SCARF).await.unwrap();
    assert_eq!(added.tier, StoreTier::Remote);
    assert!(h.remote.wishlist().contains(SCARF));

    let removed = h.sync.remove_from_wishlist(SCARF).await.unwrap();
    assert_eq!(removed.tier, StoreTier::Remote);
    assert!(h.remote.wishlist().is_empty());

    // Absent on the remote too: the 404 is not a failure.
    let again = h.sync.remove_from_wishlist(SCARF).await.unwrap();
    assert_eq!(again.tier, StoreTier::Remote);
    assert!(again.is_clean());
}

#[tokio::test]
async fn test_offline_write_lands_in_mirror() {
    let h = Harness::signed_in();
    h.remote.set_offline(true);

    let report = h.sync.add_to_wishlist(SCARF).await.unwrap();

    assert_eq!(report.tier, StoreTier::LocalCache);
    assert!(matches!(
        report.notices.as_slice(),
        [WishlistError::RemoteUnreachable(_)]
    ));
    assert!(h.sync.is_in_wishlist(SCARF));

    let fetched = h.sync.wishlist().await;
    assert_eq!(fetched.tier, StoreTier::LocalCache);
    assert!(fetched.value.contains(SCARF));
}

#[tokio::test]
async fn test_legacy_bare_id_cache_is_readable() {
    let h = Harness::new();
    h.store.set(WISHLIST_KEY, "[11, 12, 11]");

    let fetched = h.sync.wishlist().await;

    assert_eq!(fetched.value.len(), 2);
    assert!(h.sync.is_in_wishlist(SCARF));
}

#[tokio::test]
async fn test_malformed_wishlist_cache_is_reported() {
    let h = Harness::new();
    h.store.set(WISHLIST_KEY, "{not json");

    let report = h.sync.add_to_wishlist(SCARF).await.unwrap();

    assert!(matches!(
        report.notices.as_slice(),
        [WishlistError::MalformedCache(_)]
    ));
    assert_eq!(h.sync.wishlist().await.value.len(), 1);
}
