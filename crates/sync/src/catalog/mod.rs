//! Catalog reads (products, categories) behind the read-through cache.
//!
//! The synchronizer only needs a product's price, image and stock as hints
//! when a line is added without them. Category listings are cached the same
//! way and can be invalidated explicitly, which signals `categoriesChanged`.

mod cache;

use np_commerce_core::{CategoryId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

pub use cache::{ReadThroughCache, cache_key};

use crate::bus::{InvalidationBus, Topic};
use crate::error::CatalogError;
use crate::remote::{CommerceApi, RemoteCall, RequestOptions, decode_list};

const CATEGORIES_ENDPOINT: &str = "categories/";
const PRODUCTS_ENDPOINT: &str = "products/";

/// The fields of a product record the synchronizer uses. Anything else the
/// backend sends is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub main_image: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    /// Units in stock, when the backend tracks it.
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductRecord {
    /// `true` when the backend reports no stock. Unknown stock is available.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.stock.is_some_and(|stock| stock <= 0)
    }
}

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub parent: Option<CategoryId>,
}

/// Cached catalog reads over the remote store.
#[derive(Debug, Clone)]
pub struct Catalog<R> {
    api: CommerceApi<R>,
    cache: ReadThroughCache<Value>,
    bus: InvalidationBus,
}

impl<R: RemoteCall> Catalog<R> {
    pub const fn new(
        api: CommerceApi<R>,
        cache: ReadThroughCache<Value>,
        bus: InvalidationBus,
    ) -> Self {
        Self { api, cache, bus }
    }

    pub const fn cache(&self) -> &ReadThroughCache<Value> {
        &self.cache
    }

    /// Cached `GET` of a catalog endpoint. Catalog reads are anonymous.
    async fn read(&self, endpoint: &str, options: &RequestOptions) -> Result<Value, CatalogError> {
        let value = self
            .cache
            .get_request(endpoint, options, || self.api.request(endpoint, options, None))
            .await?;
        Ok(value)
    }

    /// `getProduct(productId)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the product cannot be fetched and nothing is cached.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<ProductRecord, CatalogError> {
        let value = self
            .read(&product_endpoint(id), &RequestOptions::get())
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Product listing, optionally filtered by search text and category.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched and nothing is cached.
    #[instrument(skip(self))]
    pub async fn products(
        &self,
        search: Option<&str>,
        category: Option<CategoryId>,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        let mut options = RequestOptions::get();
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            options = options.with_query("search", search);
        }
        if let Some(category) = category {
            options = options.with_query("category", category.to_string());
        }
        let value = self.read(PRODUCTS_ENDPOINT, &options).await?;
        Ok(decode_list(value)?)
    }

    /// Every category.
    ///
    /// # Errors
    ///
    /// Returns an error if categories cannot be fetched and nothing is cached.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        let value = self.read(CATEGORIES_ENDPOINT, &RequestOptions::get()).await?;
        let categories: Vec<Category> = decode_list(value)?;
        debug!(count = categories.len(), "Loaded categories");
        Ok(categories)
    }

    /// Forget the cached record for one product.
    pub async fn invalidate_product(&self, id: ProductId) {
        self.cache.invalidate_prefix(&product_endpoint(id)).await;
    }

    /// Forget cached category reads and signal `categoriesChanged`.
    pub async fn invalidate_categories(&self) {
        self.cache.invalidate_prefix(CATEGORIES_ENDPOINT).await;
        self.bus.publish(Topic::CategoriesChanged);
    }
}

fn product_endpoint(id: ProductId) -> String {
    format!("{PRODUCTS_ENDPOINT}{id}/")
}
