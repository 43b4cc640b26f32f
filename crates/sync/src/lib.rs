//! Naked Pineapple commerce synchronizer.
//!
//! Keeps a shopper's cart and wishlist consistent across the authoritative
//! remote store and a persistent local mirror, and tells independent UI
//! components when their slice may have changed.
//!
//! # Architecture
//!
//! - [`store`] - Synchronous key/value primitives and the cart/wishlist mirror
//! - [`remote`] - Opaque `remoteCall` collaborator, HTTP implementation, typed endpoints
//! - [`bus`] - Typed invalidation bus (`cartChanged`, `wishlistChanged`, `categoriesChanged`)
//! - [`catalog`] - Read-through TTL cache over catalog reads
//! - [`synchronizer`] - Cart/wishlist operations walking the degradation ladder
//! - [`views`] - Derived counters recomputed on invalidation
//!
//! Every tier is an explicit function so failures can be injected per tier.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bus;
pub mod catalog;
pub mod config;
pub mod error;
pub mod remote;
pub mod store;
pub mod synchronizer;
pub mod views;

pub use bus::{InvalidationBus, Subscription, Topic};
pub use catalog::{Catalog, Category, ProductRecord, ReadThroughCache};
pub use config::{ConfigError, SyncConfig, SyncOptions};
pub use error::{
    CartError, CartResult, CatalogError, Fetched, StoreTier, SyncReport, WishlistError,
    WishlistResult,
};
pub use remote::{CommerceApi, HttpRemote, Method, RemoteCall, RemoteError, RequestOptions};
pub use store::{FileStore, LocalMirror, LocalStore, MemoryStore};
pub use synchronizer::{AddToCart, Synchronizer};
pub use views::CountBadge;
