//! Integration tests for derived count badges.
//!
//! Badges recompute from the local mirror whenever their topic fires, so
//! they track every write regardless of which tier accepted it.

use np_commerce_core::ProductId;
use np_commerce_integration_tests::{CART_KEY, Harness, dec, option, shopper};
use np_commerce_sync::{AddToCart, CountBadge, LocalStore};

fn hoodie(quantity: u32) -> AddToCart {
    AddToCart::new(ProductId::new(3), "Hoodie", quantity)
        .options(option("size", "S"))
        .price(dec("60"))
        .image("/media/hoodie.jpg")
}

#[tokio::test]
async fn test_cart_badge_follows_mutations() {
    let h = Harness::new();
    let badge = CountBadge::cart(&h.sync);
    assert_eq!(badge.current(), 0);

    let line_id = h.sync.add_to_cart(hoodie(2)).await.unwrap().line_id.unwrap();
    assert_eq!(badge.current(), 2);

    h.sync.update_quantity(&line_id, 5).await.unwrap();
    assert_eq!(badge.current(), 5);

    h.sync.clear_cart(&h.sync.identity()).await.unwrap();
    assert_eq!(badge.current(), 0);
}

#[tokio::test]
async fn test_cart_badge_counts_degraded_writes() {
    let h = Harness::signed_in();
    let badge = CountBadge::cart(&h.sync);
    h.remote.set_offline(true);

    h.sync.add_to_cart(hoodie(3)).await.unwrap();

    assert_eq!(badge.current(), 3);
}

#[tokio::test]
async fn test_wishlist_badge_follows_toggles() {
    let h = Harness::new();
    let badge = CountBadge::wishlist(&h.sync);

    h.sync.toggle_wishlist(ProductId::new(1)).await.unwrap();
    h.sync.toggle_wishlist(ProductId::new(2)).await.unwrap();
    assert_eq!(badge.current(), 2);

    h.sync.toggle_wishlist(ProductId::new(1)).await.unwrap();
    assert_eq!(badge.current(), 1);
}

#[tokio::test]
async fn test_sign_in_recomputes_badges() {
    let h = Harness::new();
    let badge = CountBadge::cart(&h.sync);
    h.sync.add_to_cart(hoodie(1)).await.unwrap();

    // Another process emptied the stored cart behind the synchronizer's back.
    h.store.set(CART_KEY, "[]");
    assert_eq!(badge.current(), 1);

    h.sync.set_identity(shopper());
    assert_eq!(badge.current(), 0);
}

#[tokio::test]
async fn test_dropped_badge_unsubscribes() {
    let h = Harness::new();
    let badge = CountBadge::cart(&h.sync);
    assert_eq!(h.sync.bus().handler_count(), 1);

    drop(badge);

    assert_eq!(h.sync.bus().handler_count(), 0);
}
