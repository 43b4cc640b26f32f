//! Cart and wishlist snapshots held in the local store.
//!
//! This is the local tier of the degradation ladder. Reads never fail: a
//! missing key is an empty collection, a malformed one is an empty
//! collection plus a diagnostic. Writes go through [`LocalMirror::update_cart`]
//! and [`LocalMirror::update_wishlist`], which hold a lock across the
//! read-modify-write so no two mutations interleave between load and save.

use std::sync::{Arc, Mutex, PoisonError};

use np_commerce_core::{Cart, CartLine, ProductId, Wishlist, WishlistEntry};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::LocalStore;

/// A value read from the mirror, plus why part of it had to be discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    /// Set when the stored snapshot was corrupt or held invalid entries.
    pub malformed: Option<String>,
}

impl<T> Loaded<T> {
    const fn clean(value: T) -> Self {
        Self {
            value,
            malformed: None,
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Loaded<U> {
        Loaded {
            value: f(self.value),
            malformed: self.malformed,
        }
    }
}

/// Wishlist entries have been stored both as objects and as bare ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Entry(WishlistEntry),
    Bare(ProductId),
}

impl From<StoredEntry> for WishlistEntry {
    fn from(entry: StoredEntry) -> Self {
        match entry {
            StoredEntry::Entry(entry) => entry,
            StoredEntry::Bare(product_id) => Self { product_id },
        }
    }
}

/// Namespaced cart/wishlist snapshots over a [`LocalStore`].
#[derive(Clone)]
pub struct LocalMirror {
    store: Arc<dyn LocalStore>,
    cart_key: String,
    wishlist_key: String,
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for LocalMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMirror")
            .field("cart_key", &self.cart_key)
            .field("wishlist_key", &self.wishlist_key)
            .finish_non_exhaustive()
    }
}

impl LocalMirror {
    /// Mirror using `{namespace}:cart` and `{namespace}:wishlist`.
    pub fn new(store: Arc<dyn LocalStore>, namespace: &str) -> Self {
        Self {
            store,
            cart_key: format!("{namespace}:cart"),
            wishlist_key: format!("{namespace}:wishlist"),
            lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn cart_key(&self) -> &str {
        &self.cart_key
    }

    #[must_use]
    pub fn wishlist_key(&self) -> &str {
        &self.wishlist_key
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Read the cached cart.
    #[must_use]
    pub fn load_cart(&self) -> Loaded<Cart> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_cart()
    }

    /// Overwrite the cached cart.
    pub(crate) fn save_cart(&self, cart: &Cart) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write(&self.cart_key, cart);
    }

    /// Atomically load, modify and persist the cached cart.
    pub(crate) fn update_cart<R>(&self, f: impl FnOnce(&mut Cart) -> R) -> Loaded<R> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut loaded = self.read_cart();
        let out = f(&mut loaded.value);
        self.write(&self.cart_key, &loaded.value);
        loaded.map(|_| out)
    }

    /// Persist an empty cart.
    pub(crate) fn clear_cart(&self) {
        self.save_cart(&Cart::new());
    }

    fn read_cart(&self) -> Loaded<Cart> {
        // Cart::from drops zero-quantity lines and folds duplicates.
        self.read_array::<CartLine>(&self.cart_key).map(Cart::from)
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Read the cached wishlist.
    #[must_use]
    pub fn load_wishlist(&self) -> Loaded<Wishlist> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_wishlist()
    }

    /// Overwrite the cached wishlist.
    pub(crate) fn save_wishlist(&self, wishlist: &Wishlist) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write(&self.wishlist_key, wishlist);
    }

    /// Atomically load, modify and persist the cached wishlist.
    pub(crate) fn update_wishlist<R>(&self, f: impl FnOnce(&mut Wishlist) -> R) -> Loaded<R> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut loaded = self.read_wishlist();
        let out = f(&mut loaded.value);
        self.write(&self.wishlist_key, &loaded.value);
        loaded.map(|_| out)
    }

    fn read_wishlist(&self) -> Loaded<Wishlist> {
        self.read_array::<StoredEntry>(&self.wishlist_key)
            .map(|entries| {
                Wishlist::from(
                    entries
                        .into_iter()
                        .map(WishlistEntry::from)
                        .collect::<Vec<_>>(),
                )
            })
    }

    // =========================================================================
    // Raw access
    // =========================================================================

    /// Decode a JSON array, dropping elements that do not parse.
    fn read_array<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Loaded<Vec<T>> {
        let Some(raw) = self.store.get(key) else {
            return Loaded::clean(Vec::new());
        };

        let items = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            Ok(Value::Null) => return Loaded::clean(Vec::new()),
            Ok(other) => {
                return malformed(key, format!("expected an array, found {}", kind(&other)));
            }
            Err(e) => return malformed(key, format!("corrupt JSON: {e}")),
        };

        let total = items.len();
        let parsed: Vec<T> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        let dropped = total - parsed.len();

        if dropped == 0 {
            debug!(key, count = total, "Loaded local snapshot");
            return Loaded::clean(parsed);
        }

        let reason = format!("dropped {dropped} of {total} invalid entries");
        warn!(key, reason = %reason, "Local snapshot partially malformed");
        Loaded {
            value: parsed,
            malformed: Some(reason),
        }
    }

    fn write<T: serde::Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.store.set(key, &json),
            Err(e) => warn!(key, error = %e, "Failed to encode local snapshot"),
        }
    }
}

fn malformed<T>(key: &str, reason: String) -> Loaded<Vec<T>> {
    warn!(key, reason = %reason, "Local snapshot malformed, treating as empty");
    Loaded {
        value: Vec::new(),
        malformed: Some(reason),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
