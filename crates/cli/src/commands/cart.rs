//! `np-commerce cart ...`

use np_commerce_core::{
    Attachments, Identity, LineId, OptionsPricing, ProductId, SelectedOptions,
};
use np_commerce_sync::{AddToCart, CartError, CartResult, HttpRemote, Synchronizer};
use rust_decimal::Decimal;

use crate::output;

type HttpSync = Synchronizer<HttpRemote>;

/// Parsed `cart add` arguments.
pub struct AddArgs {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub options: Vec<(String, String)>,
    pub option_prices: Vec<(String, Decimal)>,
    pub price: Option<Decimal>,
    pub image: Option<String>,
    pub note: Option<String>,
}

impl From<AddArgs> for AddToCart {
    fn from(args: AddArgs) -> Self {
        let mut request = Self::new(args.product_id, args.name, args.quantity);
        if !args.options.is_empty() {
            request = request.options(args.options.into_iter().collect());
        }
        if !args.option_prices.is_empty() {
            let pricing = args
                .option_prices
                .into_iter()
                .fold(OptionsPricing::new(), |p, (name, delta)| p.with(name, delta));
            request = request.pricing(pricing);
        }
        if let Some(note) = args.note {
            request = request.attachments(Attachments::note(note));
        }
        request.price_hint = args.price;
        request.image_hint = args.image;
        request
    }
}

pub async fn show(sync: &HttpSync) {
    let fetched = sync.cart().await;
    output::cart(&fetched.value, fetched.tier);
    output::notices(&fetched.notices);
}

pub async fn add(sync: &HttpSync, args: AddArgs) -> Result<(), CartError> {
    let report = sync.add_to_cart(args.into()).await?;
    output::report("Added", &report);
    Ok(())
}

pub async fn set_quantity(
    sync: &HttpSync,
    line_id: &LineId,
    quantity: u32,
) -> Result<(), CartError> {
    let report = sync.update_quantity(line_id, quantity).await?;
    output::report("Updated", &report);
    Ok(())
}

fn print(action: &str, result: CartResult) {
    match result {
        Ok(report) => output::report(action, &report),
        Err(e) => tracing::error!("{action} failed: {e}"),
    }
}

pub async fn change_options(
    sync: &HttpSync,
    line_id: &LineId,
    options: Vec<(String, String)>,
) {
    let selected: SelectedOptions = options.into_iter().collect();
    print("Re-keyed", sync.change_options(line_id, selected, None).await);
}

pub async fn remove(sync: &HttpSync, line_id: &LineId) {
    print("Removed", sync.remove_from_cart(line_id).await);
}

pub async fn clear(sync: &HttpSync, identity: &Identity) {
    print("Cleared", sync.clear_cart(identity).await);
}

pub async fn merge(sync: &HttpSync) -> Result<(), CartError> {
    let report = sync.merge_local_cart_into_remote().await?;
    output::report("Merged", &report);
    Ok(())
}
