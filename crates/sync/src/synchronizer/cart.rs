//! Cart operations.

use np_commerce_core::{
    Attachments, Cart, CartLine, Identity, LineId, LineSnapshot, OptionsPricing, ProductId,
    SelectedOptions,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing::{debug, info, instrument, warn};

use super::{Synchronizer, degraded};
use crate::bus::Topic;
use crate::error::{CartError, CartResult, Fetched, StoreTier, SyncReport};
use crate::remote::{RemoteCall, RemoteError, UpsertLine};

/// Arguments to [`Synchronizer::add_to_cart`].
#[derive(Debug, Clone, PartialEq)]
pub struct AddToCart {
    pub product_id: ProductId,
    /// Display name captured into the line snapshot.
    pub name: String,
    pub quantity: u32,
    pub selected_options: Option<SelectedOptions>,
    pub options_pricing: Option<OptionsPricing>,
    pub attachments: Option<Attachments>,
    pub price_hint: Option<Decimal>,
    pub image_hint: Option<String>,
}

impl AddToCart {
    #[must_use]
    pub fn new(product_id: ProductId, name: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id,
            name: name.into(),
            quantity,
            selected_options: None,
            options_pricing: None,
            attachments: None,
            price_hint: None,
            image_hint: None,
        }
    }

    #[must_use]
    pub fn options(mut self, selected_options: SelectedOptions) -> Self {
        self.selected_options = Some(selected_options);
        self
    }

    #[must_use]
    pub fn pricing(mut self, options_pricing: OptionsPricing) -> Self {
        self.options_pricing = Some(options_pricing);
        self
    }

    #[must_use]
    pub fn attachments(mut self, attachments: Attachments) -> Self {
        self.attachments = Some(attachments);
        self
    }

    #[must_use]
    pub const fn price(mut self, price: Decimal) -> Self {
        self.price_hint = Some(price);
        self
    }

    #[must_use]
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image_hint = Some(image.into());
        self
    }

    fn into_line(self) -> CartLine {
        let mut line = CartLine::new(
            self.product_id,
            self.quantity,
            self.selected_options.unwrap_or_default(),
            LineSnapshot::capture(self.name, self.price_hint, self.image_hint),
        );
        line.options_pricing = self.options_pricing.unwrap_or_default();
        line.attachments = self.attachments;
        line
    }
}

impl<R: RemoteCall> Synchronizer<R> {
    // =========================================================================
    // Reads
    // =========================================================================

    /// The shopper's cart from the best tier available.
    ///
    /// Signed in: the remote cart, mirrored locally on success. Otherwise, or
    /// when the remote fails, the local mirror (empty if missing or corrupt).
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Fetched<Cart, CartError> {
        let mut notices = Vec::new();

        if let Some(token) = self.token() {
            let fetched = match self.settle_remote_cart(&token).await {
                Ok(()) => self.api.fetch_cart(&token).await,
                Err(e) => Err(e),
            };
            match fetched {
                Ok(cart) => {
                    self.mirror.save_cart(&cart);
                    return Fetched {
                        value: cart,
                        tier: StoreTier::Remote,
                        notices,
                    };
                }
                Err(e) => notices.push(CartError::RemoteUnreachable(degraded("cart", &e))),
            }
        }

        let loaded = self.mirror.load_cart();
        notices.extend(loaded.malformed.map(CartError::MalformedCache));
        Fetched {
            value: loaded.value,
            tier: StoreTier::LocalCache,
            notices,
        }
    }

    /// Badge count: sum of quantities in the local mirror.
    pub fn cart_count(&self) -> u64 {
        self.mirror.load_cart().value.total_quantity()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a product variant to the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `quantity` is zero. Nothing
    /// else fails the call.
    #[instrument(
        skip(self, request),
        fields(product_id = %request.product_id, quantity = request.quantity)
    )]
    pub async fn add_to_cart(&self, mut request: AddToCart) -> CartResult {
        if request.quantity == 0 {
            return Err(CartError::InvalidQuantity(0));
        }

        let mut notices = Vec::new();
        if request.price_hint.is_none() || request.image_hint.is_none() {
            self.fill_hints(&mut request, &mut notices).await;
        }
        let line = request.into_line();

        let mut tier = StoreTier::LocalCache;
        let mut confirmed = None;
        if let Some(token) = self.token() {
            match self.upsert_remote(&token, &line).await {
                Ok(remote_line) => {
                    tier = StoreTier::Remote;
                    confirmed = remote_line;
                }
                Err(e) => notices.push(CartError::RemoteUnreachable(degraded("add_to_cart", &e))),
            }
        }

        let loaded = self.mirror.update_cart(|cart| match confirmed {
            Some(mut remote_line) => {
                remote_line.snapshot.backfill(&line.snapshot);
                if remote_line.attachments.is_none() {
                    remote_line.attachments.clone_from(&line.attachments);
                }
                if remote_line.options_pricing.is_empty() {
                    remote_line.options_pricing.clone_from(&line.options_pricing);
                }
                cart.replace_variant(remote_line)
            }
            None => cart.merge_line(line).line_id().clone(),
        });
        notices.extend(loaded.malformed.map(CartError::MalformedCache));

        debug!(line_id = %loaded.value, tier = ?tier, "Line added");
        self.publish(Topic::CartChanged);
        Ok(SyncReport::new(tier)
            .with_line(loaded.value)
            .with_notices(notices))
    }

    /// Change a line's quantity. An unknown line is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `quantity` is zero.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, line_id: &LineId, quantity: u32) -> CartResult {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(0));
        }

        let mut notices = Vec::new();
        let tier = match self.token() {
            Some(token) => {
                let result = match self.settle_remote_cart(&token).await {
                    Ok(()) => self.api.update_quantity(&token, line_id, quantity).await,
                    Err(e) => Err(e),
                };
                remote_tier(result, "update_quantity", &mut notices)
            }
            None => StoreTier::LocalCache,
        };

        let loaded = self
            .mirror
            .update_cart(|cart| cart.set_quantity(line_id, quantity));
        notices.extend(loaded.malformed.map(CartError::MalformedCache));

        self.publish(Topic::CartChanged);
        let report = SyncReport::new(tier).with_notices(notices);
        Ok(if loaded.value {
            report.with_line(line_id.clone())
        } else {
            debug!("Line not in cart");
            report
        })
    }

    /// Re-key a line to a new option selection.
    ///
    /// If another line already holds the new variant the two are merged, so
    /// the returned report may name a different line than the one passed in.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the cart API uniform.
    #[instrument(skip(self, selected_options, options_pricing))]
    pub async fn change_options(
        &self,
        line_id: &LineId,
        selected_options: SelectedOptions,
        options_pricing: Option<OptionsPricing>,
    ) -> CartResult {
        let mut notices = Vec::new();
        let tier = match self.token() {
            Some(token) => {
                let result = match self.settle_remote_cart(&token).await {
                    Ok(()) => {
                        self.api
                            .update_options(
                                &token,
                                line_id,
                                &selected_options,
                                options_pricing.as_ref(),
                            )
                            .await
                    }
                    Err(e) => Err(e),
                };
                remote_tier(result, "change_options", &mut notices)
            }
            None => StoreTier::LocalCache,
        };

        let loaded = self
            .mirror
            .update_cart(|cart| cart.rekey_line(line_id, selected_options, options_pricing));
        notices.extend(loaded.malformed.map(CartError::MalformedCache));

        self.publish(Topic::CartChanged);
        let report = SyncReport::new(tier).with_notices(notices);
        Ok(match loaded.value {
            Some(survivor) => report.with_line(survivor),
            None => report,
        })
    }

    /// Remove a line. An unknown line is a successful no-op.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the cart API uniform.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, line_id: &LineId) -> CartResult {
        let mut notices = Vec::new();
        let tier = match self.token() {
            Some(token) => {
                let result = match self.settle_remote_cart(&token).await {
                    Ok(()) => self.api.remove_line(&token, line_id).await,
                    Err(e) => Err(e),
                };
                remote_tier(result, "remove_from_cart", &mut notices)
            }
            None => StoreTier::LocalCache,
        };

        let loaded = self.mirror.update_cart(|cart| cart.remove_line(line_id));
        notices.extend(loaded.malformed.map(CartError::MalformedCache));

        self.publish(Topic::CartChanged);
        Ok(SyncReport::new(tier).with_notices(notices))
    }

    /// Empty the cart for `identity`: the remote cart first, then the mirror.
    ///
    /// The mirror is cleared and `cartChanged` published even when the remote
    /// clear fails. In that case the remote clear is retried before that
    /// shopper's next remote cart access, even across a sign-out, so a later
    /// read cannot resurrect the old lines.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the cart API uniform.
    #[instrument(skip(self, identity), fields(authenticated = identity.is_authenticated()))]
    pub async fn clear_cart(&self, identity: &Identity) -> CartResult {
        let mut notices = Vec::new();
        let mut tier = StoreTier::LocalCache;

        if let Some(token) = identity.access_token() {
            match self.api.clear_cart(token).await {
                Ok(()) => {
                    self.settle_pending_clear(identity.user_id());
                    tier = StoreTier::Remote;
                }
                Err(e) => {
                    *self.pending_clear() = identity.user_id();
                    notices.push(CartError::RemoteUnreachable(degraded("clear_cart", &e)));
                }
            }
        }

        self.mirror.clear_cart();
        info!(tier = ?tier, "Cart cleared");
        self.publish(Topic::CartChanged);
        Ok(SyncReport::new(tier).with_notices(notices))
    }

    /// After sign-in, push every line of the local cart to the remote.
    ///
    /// Each line is dropped from the mirror as soon as the remote accepts it,
    /// so a retry after a partial failure only pushes what is left. If every
    /// push succeeds the mirror is replaced by the remote cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::IdentityRequired`] for an anonymous shopper.
    #[instrument(skip(self))]
    pub async fn merge_local_cart_into_remote(&self) -> CartResult {
        let Some(token) = self.token() else {
            return Err(CartError::IdentityRequired);
        };

        let loaded = self.mirror.load_cart();
        let mut notices: Vec<CartError> = loaded
            .malformed
            .map(CartError::MalformedCache)
            .into_iter()
            .collect();

        let pushed = async {
            self.settle_remote_cart(&token).await?;
            for line in loaded.value.lines() {
                self.api.upsert_line(&token, UpsertLine::from(line)).await?;
                self.mirror.update_cart(|cart| cart.remove_line(&line.line_id));
            }
            self.api.fetch_cart(&token).await
        }
        .await;

        let tier = match pushed {
            Ok(remote_cart) => {
                info!(
                    pushed = loaded.value.len(),
                    remote_lines = remote_cart.len(),
                    "Merged local cart into remote"
                );
                self.mirror.save_cart(&remote_cart);
                StoreTier::Remote
            }
            Err(e) => {
                notices.push(CartError::RemoteUnreachable(degraded("merge_local_cart", &e)));
                StoreTier::LocalCache
            }
        };

        self.publish(Topic::CartChanged);
        Ok(SyncReport::new(tier).with_notices(notices))
    }

    // =========================================================================
    // Tiers
    // =========================================================================

    /// Read the product once for missing hints. Failure leaves hints empty.
    async fn fill_hints(&self, request: &mut AddToCart, notices: &mut Vec<CartError>) {
        match self.catalog.product(request.product_id).await {
            Ok(product) => {
                if product.is_sold_out() {
                    warn!(product_id = %request.product_id, "Adding a sold out product");
                    notices.push(CartError::ProductUnavailable(request.product_id));
                }
                if request.price_hint.is_none() {
                    request.price_hint = product.price;
                }
                if request.image_hint.is_none() {
                    request.image_hint = product.main_image;
                }
                if request.name.is_empty() {
                    request.name = product.name;
                }
            }
            Err(e) => {
                debug!(error = %e, "Product lookup failed, continuing without hints");
            }
        }
    }

    async fn upsert_remote(
        &self,
        token: &SecretString,
        line: &CartLine,
    ) -> Result<Option<CartLine>, RemoteError> {
        self.settle_remote_cart(token).await?;
        self.api.upsert_line(token, UpsertLine::from(line)).await
    }
}

/// Tier that ended up holding a remote-first write.
fn remote_tier(
    result: Result<(), RemoteError>,
    operation: &'static str,
    notices: &mut Vec<CartError>,
) -> StoreTier {
    match result {
        Ok(()) => StoreTier::Remote,
        Err(e) => {
            notices.push(CartError::RemoteUnreachable(degraded(operation, &e)));
            StoreTier::LocalCache
        }
    }
}
