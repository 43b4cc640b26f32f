//! `np-commerce wishlist ...`

use std::process::ExitCode;

use np_commerce_core::ProductId;
use np_commerce_sync::{HttpRemote, Synchronizer, WishlistResult};

use crate::output;

type HttpSync = Synchronizer<HttpRemote>;

pub async fn show(sync: &HttpSync) {
    let fetched = sync.wishlist().await;
    output::wishlist(&fetched.value, fetched.tier);
    output::notices(&fetched.notices);
}

fn print(action: &str, result: WishlistResult) {
    match result {
        Ok(report) => output::report(action, &report),
        Err(e) => tracing::error!("{action} failed: {e}"),
    }
}

pub async fn add(sync: &HttpSync, product_id: ProductId) {
    print("Added", sync.add_to_wishlist(product_id).await);
}

pub async fn remove(sync: &HttpSync, product_id: ProductId) {
    print("Removed", sync.remove_from_wishlist(product_id).await);
}

pub async fn toggle(sync: &HttpSync, product_id: ProductId) {
    print("Toggled", sync.toggle_wishlist(product_id).await);
    output::flag(sync.is_in_wishlist(product_id));
}

/// Membership as an exit code, for scripting.
pub fn has(sync: &HttpSync, product_id: ProductId) -> ExitCode {
    let present = sync.is_in_wishlist(product_id);
    output::flag(present);
    if present {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
