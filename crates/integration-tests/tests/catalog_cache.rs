//! Integration tests for cached catalog reads.
//!
//! Time is paused so TTL expiry is driven by `tokio::time::advance`.

use std::time::Duration;

use np_commerce_core::ProductId;
use np_commerce_integration_tests::Harness;
use np_commerce_sync::{CatalogError, SyncOptions, Topic};
use serde_json::json;

fn harness() -> Harness {
    let h = Harness::with_options(&SyncOptions {
        catalog_ttl: Duration::from_secs(30),
        ..SyncOptions::default()
    });
    h.remote.set_categories(json!([
        { "id": 1, "name": "Outerwear" },
        { "id": 2, "name": "Jackets", "parent": 1 },
    ]));
    h.remote.add_product(42, "150.00", "/media/jacket.jpg", 3);
    h
}

#[tokio::test(start_paused = true)]
async fn test_fresh_reads_hit_the_cache() {
    let h = harness();

    let first = h.sync.catalog().categories().await.unwrap();
    let second = h.sync.catalog().categories().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(h.remote.count("GET categories/"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entries_are_refetched() {
    let h = harness();
    h.sync.catalog().categories().await.unwrap();

    tokio::time::advance(Duration::from_secs(31)).await;
    h.sync.catalog().categories().await.unwrap();

    assert_eq!(h.remote.count("GET categories/"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stale_value_served_when_refresh_fails() {
    let h = harness();
    let product = h.sync.catalog().product(ProductId::new(42)).await.unwrap();

    tokio::time::advance(Duration::from_secs(60)).await;
    h.remote.set_offline(true);
    let stale = h.sync.catalog().product(ProductId::new(42)).await.unwrap();

    assert_eq!(stale, product);
    assert_eq!(h.remote.count("GET products/42/"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failure_without_cached_value_propagates() {
    let h = harness();
    h.remote.set_offline(true);

    let err = h.sync.catalog().product(ProductId::new(42)).await.unwrap_err();

    assert!(matches!(err, CatalogError::Remote(_)));
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_categories_refetches_and_signals() {
    let h = harness();
    let mut rx = h.sync.bus().watch();
    h.sync.catalog().categories().await.unwrap();

    h.remote.set_categories(json!([{ "id": 3, "name": "Hats" }]));
    h.sync.catalog().invalidate_categories().await;
    let categories = h.sync.catalog().categories().await.unwrap();

    assert_eq!(rx.try_recv().unwrap(), Topic::CategoriesChanged);
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Hats");
    assert_eq!(h.remote.count("GET categories/"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_product_search_is_cached_per_query() {
    let h = harness();
    let catalog = h.sync.catalog();

    catalog.products(Some("jacket"), None).await.unwrap();
    catalog.products(Some("jacket"), None).await.unwrap();
    catalog.products(Some("scarf"), None).await.unwrap();

    assert_eq!(h.remote.count("GET products/"), 2);
}
