//! Behavioural tests for the commerce synchronizer.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p np-commerce-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_sync` - dedup, degradation, clear finality, sign-in merge
//! - `wishlist_sync` - membership idempotence and toggling
//! - `catalog_cache` - TTL, stale fallback, invalidation
//! - `badges` - derived counts driven by the invalidation bus
//!
//! Everything runs in-process: the remote store is [`FakeCommerce`], an
//! in-memory backend that speaks the same endpoints as the real one, and the
//! local mirror sits on a [`MemoryStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use np_commerce_core::{
    Attachments, Cart, CartLine, Identity, LineId, LineSnapshot, OptionsPricing, ProductId,
    SelectedOptions, UserId, Wishlist,
};
use np_commerce_sync::{
    InvalidationBus, Method, MemoryStore, RemoteCall, RemoteError, RequestOptions, SyncOptions,
    Synchronizer,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};

/// Key the default options give the cart in the local store.
pub const CART_KEY: &str = "np:cart";

/// Key the default options give the wishlist in the local store.
pub const WISHLIST_KEY: &str = "np:wishlist";

/// `POST cart/` body as the backend reads it.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertBody {
    product_id: ProductId,
    quantity: u32,
    #[serde(default)]
    selected_options: SelectedOptions,
    #[serde(default)]
    options_pricing: OptionsPricing,
    attachments: Option<Attachments>,
    #[serde(default)]
    name: String,
    price: Option<Decimal>,
    image: Option<String>,
}

#[derive(Default)]
struct State {
    cart: Cart,
    wishlist: Wishlist,
    products: BTreeMap<ProductId, Value>,
    categories: Vec<Value>,
}

/// In-memory commerce backend.
///
/// Cart and wishlist endpoints require a token. While offline every call
/// fails with [`RemoteError::Unavailable`]. Every request is logged as
/// `"METHOD endpoint"`, offline or not.
#[derive(Default)]
pub struct FakeCommerce {
    state: Mutex<State>,
    offline: AtomicBool,
    fail_clear: AtomicBool,
    cart_post_budget: Mutex<Option<usize>>,
    requests: Mutex<Vec<String>>,
}

impl FakeCommerce {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make `DELETE cart/` fail while everything else keeps working.
    pub fn set_fail_clear(&self, fail: bool) {
        self.fail_clear.store(fail, Ordering::SeqCst);
    }

    /// Accept only `budget` more `POST cart/` calls, then fail the rest.
    /// `None` lifts the limit.
    pub fn set_cart_post_budget(&self, budget: Option<usize>) {
        *self.cart_post_budget.lock().unwrap() = budget;
    }

    pub fn add_product(&self, id: i32, price: &str, main_image: &str, stock: i64) {
        let record = json!({
            "id": id,
            "name": format!("Product {id}"),
            "price": price,
            "mainImage": main_image,
            "productType": "apparel",
            "stock": stock,
        });
        self.state
            .lock()
            .unwrap()
            .products
            .insert(ProductId::new(id), record);
    }

    pub fn set_categories(&self, categories: Value) {
        let Value::Array(list) = categories else {
            panic!("categories must be a list");
        };
        self.state.lock().unwrap().categories = list;
    }

    /// Seed the remote cart directly, as another device would.
    pub fn seed_line(&self, line: CartLine) {
        self.state.lock().unwrap().cart.merge_line(line);
    }

    #[must_use]
    pub fn cart(&self) -> Cart {
        self.state.lock().unwrap().cart.clone()
    }

    #[must_use]
    pub fn wishlist(&self) -> Wishlist {
        self.state.lock().unwrap().wishlist.clone()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of logged requests equal to `request`, e.g. `"GET categories/"`.
    #[must_use]
    pub fn count(&self, request: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.as_str() == request)
            .count()
    }

    fn route(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
        signed_in: bool,
    ) -> Result<Value, RemoteError> {
        let mut state = self.state.lock().unwrap();

        if matches!(segments.first(), Some(&"cart" | &"wishlist")) && !signed_in {
            return Err(status(401, "authentication required"));
        }

        match (method, segments) {
            (Method::Get, ["cart"]) => Ok(serde_json::to_value(&state.cart)?),
            (Method::Post, ["cart"]) => {
                if let Some(budget) = self.cart_post_budget.lock().unwrap().as_mut() {
                    if *budget == 0 {
                        return Err(status(502, "cart write rejected"));
                    }
                    *budget -= 1;
                }
                let body: UpsertBody = serde_json::from_value(body.cloned().unwrap_or_default())?;
                let mut line = CartLine::new(
                    body.product_id,
                    body.quantity,
                    body.selected_options,
                    LineSnapshot::capture(body.name, body.price, body.image),
                );
                line.options_pricing = body.options_pricing;
                line.attachments = body.attachments;
                let outcome = state.cart.merge_line(line);
                let stored = state.cart.find_line(outcome.line_id()).cloned();
                Ok(serde_json::to_value(stored)?)
            }
            (Method::Patch, ["cart", line]) => {
                let line_id = LineId::new(*line);
                let body = body.cloned().unwrap_or_default();
                if state.cart.find_line(&line_id).is_none() {
                    return Err(status(404, "no such line"));
                }
                if let Some(quantity) = body.get("quantity").and_then(Value::as_u64) {
                    let quantity = u32::try_from(quantity).unwrap();
                    state.cart.set_quantity(&line_id, quantity);
                }
                if let Some(selected) = body.get("selectedOptions") {
                    let selected: SelectedOptions = serde_json::from_value(selected.clone())?;
                    let pricing = body
                        .get("optionsPricing")
                        .map(|p| serde_json::from_value(p.clone()))
                        .transpose()?;
                    state.cart.rekey_line(&line_id, selected, pricing);
                }
                Ok(Value::Null)
            }
            (Method::Delete, ["cart", line]) => {
                if state.cart.remove_line(&LineId::new(*line)) {
                    Ok(Value::Null)
                } else {
                    Err(status(404, "no such line"))
                }
            }
            (Method::Delete, ["cart"]) => {
                if self.fail_clear.load(Ordering::SeqCst) {
                    return Err(status(503, "clear failed"));
                }
                state.cart.clear();
                Ok(Value::Null)
            }
            (Method::Get, ["wishlist"]) => Ok(serde_json::to_value(&state.wishlist)?),
            (Method::Post, ["wishlist"]) => {
                let product_id = body
                    .and_then(|b| b.get("productId"))
                    .cloned()
                    .map(serde_json::from_value::<ProductId>)
                    .transpose()?
                    .ok_or_else(|| status(400, "productId required"))?;
                state.wishlist.insert(product_id);
                Ok(Value::Null)
            }
            (Method::Delete, ["wishlist", product]) => {
                let product_id = parse_product(product)?;
                if state.wishlist.remove(product_id) {
                    Ok(Value::Null)
                } else {
                    Err(status(404, "not wishlisted"))
                }
            }
            (Method::Get, ["products"]) => {
                Ok(Value::Array(state.products.values().cloned().collect()))
            }
            (Method::Get, ["products", product]) => state
                .products
                .get(&parse_product(product)?)
                .cloned()
                .ok_or_else(|| status(404, "no such product")),
            (Method::Get, ["categories"]) => Ok(Value::Array(state.categories.clone())),
            _ => Err(status(404, "no such endpoint")),
        }
    }
}

impl RemoteCall for FakeCommerce {
    async fn call(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        token: Option<&SecretString>,
    ) -> Result<Value, RemoteError> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{} {endpoint}", options.method));

        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("backend offline".to_string()));
        }

        let segments: Vec<&str> = endpoint.split('/').filter(|s| !s.is_empty()).collect();
        self.route(options.method, &segments, options.body.as_ref(), token.is_some())
    }
}

fn status(status: u16, message: &str) -> RemoteError {
    RemoteError::Status {
        status,
        message: message.to_string(),
    }
}

fn parse_product(raw: &str) -> Result<ProductId, RemoteError> {
    raw.parse().map_err(|_| status(400, "bad product id"))
}

/// A synchronizer wired to a fresh backend and an empty local store.
pub struct Harness {
    pub remote: Arc<FakeCommerce>,
    pub store: MemoryStore,
    pub sync: Synchronizer<Arc<FakeCommerce>>,
}

impl Harness {
    /// Anonymous shopper.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(&SyncOptions::default())
    }

    #[must_use]
    pub fn with_options(options: &SyncOptions) -> Self {
        let remote = FakeCommerce::new();
        let store = MemoryStore::new();
        let sync = Synchronizer::new(
            Arc::clone(&remote),
            Arc::new(store.clone()),
            InvalidationBus::new(),
            options,
        );
        Self {
            remote,
            store,
            sync,
        }
    }

    /// Signed-in shopper.
    #[must_use]
    pub fn signed_in() -> Self {
        let harness = Self::new();
        let sync = harness.sync.clone().with_identity(shopper());
        Self { sync, ..harness }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// The authenticated test shopper.
#[must_use]
pub fn shopper() -> Identity {
    Identity::authenticated(UserId::new(7), "test-token")
}

/// `{name: value}` option selection.
#[must_use]
pub fn option(name: &str, value: &str) -> SelectedOptions {
    SelectedOptions::new().with(name, value)
}

/// Parse a decimal literal.
#[must_use]
pub fn dec(raw: &str) -> Decimal {
    raw.parse().unwrap()
}
