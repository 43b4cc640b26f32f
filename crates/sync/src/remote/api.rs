//! Typed cart, wishlist and catalog endpoints.
//!
//! Every call is bounded by the configured timeout. Expiry is reported as
//! [`RemoteError::Timeout`] and never retried here.

use std::time::Duration;

use np_commerce_core::{
    Attachments, Cart, CartLine, LineId, OptionsPricing, ProductId, SelectedOptions, VariantKey,
    Wishlist, WishlistEntry,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{RemoteCall, RemoteError, RequestOptions};

/// Body of `POST cart/`: the full line as the shopper picked it.
///
/// The remote merges it with any existing line for the same variant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLine<'a> {
    pub product_id: ProductId,
    pub quantity: u32,
    pub selected_options: &'a SelectedOptions,
    pub options_pricing: &'a OptionsPricing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<&'a Attachments>,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<&'a str>,
}

impl<'a> From<&'a CartLine> for UpsertLine<'a> {
    fn from(line: &'a CartLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            selected_options: &line.selected_options,
            options_pricing: &line.options_pricing,
            attachments: line.attachments.as_ref(),
            name: &line.snapshot.name,
            price: line.snapshot.price,
            image: line.snapshot.image.as_deref(),
        }
    }
}

/// Wishlist payloads have come back both as entries and as bare ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum RemoteEntry {
    Entry(WishlistEntry),
    Bare(ProductId),
}

/// Typed client over any [`RemoteCall`].
#[derive(Debug, Clone)]
pub struct CommerceApi<R> {
    remote: R,
    timeout: Duration,
}

impl<R: RemoteCall> CommerceApi<R> {
    pub const fn new(remote: R, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue a raw call bounded by the timeout.
    ///
    /// # Errors
    ///
    /// Returns the remote's error, or [`RemoteError::Timeout`] on expiry.
    pub async fn request(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        token: Option<&SecretString>,
    ) -> Result<Value, RemoteError> {
        tokio::time::timeout(self.timeout, self.remote.call(endpoint, options, token))
            .await
            .map_err(|_| RemoteError::Timeout(self.timeout))?
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// `GET cart/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the payload is not a cart.
    #[instrument(skip(self, token))]
    pub async fn fetch_cart(&self, token: &SecretString) -> Result<Cart, RemoteError> {
        let value = self.request("cart/", &RequestOptions::get(), Some(token)).await?;
        let lines: Vec<CartLine> = decode_list(value)?;
        debug!(lines = lines.len(), "Fetched remote cart");
        Ok(Cart::from(lines))
    }

    /// `POST cart/`. Returns the line as the remote stored it, if it said.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the response cannot be decoded.
    #[instrument(
        skip(self, token, line),
        fields(product_id = %line.product_id, quantity = line.quantity)
    )]
    pub async fn upsert_line(
        &self,
        token: &SecretString,
        line: UpsertLine<'_>,
    ) -> Result<Option<CartLine>, RemoteError> {
        let key = VariantKey::resolve(line.product_id, Some(line.selected_options));
        let body = serde_json::to_value(&line)?;
        let value = self
            .request("cart/", &RequestOptions::post(body), Some(token))
            .await?;

        match value {
            Value::Null => Ok(None),
            Value::Object(ref map)
                if !map.contains_key("items") && !map.contains_key("results") =>
            {
                Ok(Some(serde_json::from_value(value)?))
            }
            // Some backends answer with the whole cart.
            other => {
                let cart = Cart::from(decode_list::<CartLine>(other)?);
                Ok(cart.find_variant(&key).cloned())
            }
        }
    }

    /// `PATCH cart/{line}/` with a new quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self, token))]
    pub async fn update_quantity(
        &self,
        token: &SecretString,
        line_id: &LineId,
        quantity: u32,
    ) -> Result<(), RemoteError> {
        let options = RequestOptions::patch(json!({ "quantity": quantity }));
        self.request(&line_endpoint(line_id), &options, Some(token))
            .await
            .map(drop)
    }

    /// `PATCH cart/{line}/` with a new option selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self, token, selected_options, options_pricing))]
    pub async fn update_options(
        &self,
        token: &SecretString,
        line_id: &LineId,
        selected_options: &SelectedOptions,
        options_pricing: Option<&OptionsPricing>,
    ) -> Result<(), RemoteError> {
        let mut body = json!({ "selectedOptions": selected_options });
        if let Some(pricing) = options_pricing {
            body["optionsPricing"] = serde_json::to_value(pricing)?;
        }
        self.request(&line_endpoint(line_id), &RequestOptions::patch(body), Some(token))
            .await
            .map(drop)
    }

    /// `DELETE cart/{line}/`. A line the remote does not know is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails for any reason other than 404.
    #[instrument(skip(self, token))]
    pub async fn remove_line(
        &self,
        token: &SecretString,
        line_id: &LineId,
    ) -> Result<(), RemoteError> {
        ignore_not_found(
            self.request(&line_endpoint(line_id), &RequestOptions::delete(), Some(token))
                .await,
        )
    }

    /// `DELETE cart/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self, token))]
    pub async fn clear_cart(&self, token: &SecretString) -> Result<(), RemoteError> {
        self.request("cart/", &RequestOptions::delete(), Some(token))
            .await
            .map(drop)
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// `GET wishlist/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the payload is not a wishlist.
    #[instrument(skip(self, token))]
    pub async fn fetch_wishlist(&self, token: &SecretString) -> Result<Wishlist, RemoteError> {
        let value = self
            .request("wishlist/", &RequestOptions::get(), Some(token))
            .await?;
        let entries: Vec<RemoteEntry> = decode_list(value)?;
        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                RemoteEntry::Entry(entry) => entry.product_id,
                RemoteEntry::Bare(product_id) => product_id,
            })
            .collect())
    }

    /// `POST wishlist/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self, token))]
    pub async fn add_to_wishlist(
        &self,
        token: &SecretString,
        product_id: ProductId,
    ) -> Result<(), RemoteError> {
        let options = RequestOptions::post(json!({ "productId": product_id }));
        self.request("wishlist/", &options, Some(token))
            .await
            .map(drop)
    }

    /// `DELETE wishlist/{product}/`. Absent entries are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails for any reason other than 404.
    #[instrument(skip(self, token))]
    pub async fn remove_from_wishlist(
        &self,
        token: &SecretString,
        product_id: ProductId,
    ) -> Result<(), RemoteError> {
        ignore_not_found(
            self.request(
                &format!("wishlist/{product_id}/"),
                &RequestOptions::delete(),
                Some(token),
            )
            .await,
        )
    }
}

fn line_endpoint(line_id: &LineId) -> String {
    format!("cart/{line_id}/")
}

fn ignore_not_found(result: Result<Value, RemoteError>) -> Result<(), RemoteError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!("Remote entry already absent");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Decode a list payload: a bare array, or an object wrapping it under
/// `items` or `results`. `null` is an empty list.
pub(crate) fn decode_list<T: for<'de> Deserialize<'de>>(
    value: Value,
) -> Result<Vec<T>, RemoteError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(mut map) => map
            .remove("items")
            .or_else(|| map.remove("results"))
            .unwrap_or(Value::Null),
        other => other,
    };
    if items.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(items)?)
}
