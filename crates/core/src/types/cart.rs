//! Cart lines and the variant-aware merge shared by every storage tier.
//!
//! A [`Cart`] never holds two lines with the same [`VariantKey`]. Adding a
//! variant that is already present increments the existing line's quantity.
//! The same rule is applied when a cart is deserialized, so a legacy cache
//! holding duplicates is normalized on first read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::{LineId, ProductId};
use super::price::OptionsPricing;
use super::variant::{SelectedOptions, VariantKey};

/// Free-form payload attached to a cart line (gift note, uploaded images).
///
/// Carried opaquely: unknown fields are preserved through `extra` and nothing
/// here is validated. Validation belongs to whichever UI produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attachments {
    /// Attachments holding only a text note.
    #[must_use]
    pub fn note(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Product display data captured when the line was added.
///
/// Used when the authoritative product record is unreachable. Price and
/// image are best-effort and may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub captured_at: DateTime<Utc>,
}

impl LineSnapshot {
    /// Snapshot captured now.
    #[must_use]
    pub fn capture(name: impl Into<String>, price: Option<Decimal>, image: Option<String>) -> Self {
        Self {
            name: name.into(),
            price,
            image,
            captured_at: Utc::now(),
        }
    }

    /// Fill in fields this snapshot is missing from another capture.
    pub fn backfill(&mut self, newer: &Self) {
        if self.price.is_none() {
            self.price = newer.price;
        }
        if self.image.is_none() {
            self.image.clone_from(&newer.image);
        }
        if self.name.is_empty() {
            self.name.clone_from(&newer.name);
        }
    }
}

/// A single line in a shopper's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub line_id: LineId,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub selected_options: SelectedOptions,
    #[serde(default)]
    pub options_pricing: OptionsPricing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Attachments>,
    #[serde(default)]
    pub snapshot: LineSnapshot,
}

impl CartLine {
    /// Create a line with a freshly generated id.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        quantity: u32,
        selected_options: SelectedOptions,
        snapshot: LineSnapshot,
    ) -> Self {
        Self {
            line_id: LineId::generate(),
            product_id,
            quantity,
            selected_options,
            options_pricing: OptionsPricing::new(),
            attachments: None,
            snapshot,
        }
    }

    #[must_use]
    pub fn variant_key(&self) -> VariantKey {
        VariantKey::resolve(self.product_id, Some(&self.selected_options))
    }

    /// Snapshot price plus the deltas of the selected options.
    ///
    /// `None` when the snapshot has no price.
    #[must_use]
    pub fn unit_price(&self) -> Option<Decimal> {
        self.snapshot
            .price
            .map(|base| base + self.options_pricing.delta_for(&self.selected_options))
    }

    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price()
            .map(|unit| unit * Decimal::from(self.quantity))
    }
}

/// What [`Cart::merge_line`] did with the incoming line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// An existing line with the same variant key absorbed the quantity.
    Incremented(LineId),
    /// No matching variant; the line was appended.
    Inserted(LineId),
}

impl MergeOutcome {
    #[must_use]
    pub const fn line_id(&self) -> &LineId {
        match self {
            Self::Incremented(id) | Self::Inserted(id) => id,
        }
    }
}

/// A shopper's cart: an ordered list of lines, deduplicated by variant key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Sum of quantities across all lines (the badge count).
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of line totals; lines without a known price are skipped.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().filter_map(CartLine::line_total).sum()
    }

    #[must_use]
    pub fn find_line(&self, line_id: &LineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.line_id == line_id)
    }

    #[must_use]
    pub fn find_variant(&self, key: &VariantKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.variant_key() == key)
    }

    /// Lines for a given product, across all of its variants.
    pub fn lines_for(&self, product_id: ProductId) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(move |l| l.product_id == product_id)
    }

    /// Add a line, incrementing the existing line for the same variant if any.
    ///
    /// On increment the existing line keeps its id, attachments and pricing;
    /// snapshot fields it is missing are backfilled from the incoming line.
    pub fn merge_line(&mut self, line: CartLine) -> MergeOutcome {
        let key = line.variant_key();
        if let Some(existing) = self.lines.iter_mut().find(|l| l.variant_key() == key) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
            existing.snapshot.backfill(&line.snapshot);
            if existing.attachments.is_none() {
                existing.attachments = line.attachments;
            }
            if existing.options_pricing.is_empty() {
                existing.options_pricing = line.options_pricing;
            }
            return MergeOutcome::Incremented(existing.line_id.clone());
        }

        let id = line.line_id.clone();
        self.lines.push(line);
        MergeOutcome::Inserted(id)
    }

    /// Store a line exactly as given, replacing whichever line holds the
    /// same variant. Used to mirror a line the remote store has already
    /// merged, so no quantity arithmetic happens here.
    pub fn replace_variant(&mut self, line: CartLine) -> LineId {
        let key = line.variant_key();
        let id = line.line_id.clone();
        if let Some(existing) = self.lines.iter_mut().find(|l| l.variant_key() == key) {
            *existing = line;
        } else {
            self.lines.push(line);
        }
        id
    }

    /// Set a line's quantity. Returns `false` if the line does not exist.
    pub fn set_quantity(&mut self, line_id: &LineId, quantity: u32) -> bool {
        self.lines
            .iter_mut()
            .find(|l| &l.line_id == line_id)
            .map(|l| l.quantity = quantity)
            .is_some()
    }

    /// Remove a line. Returns `false` if the line does not exist.
    pub fn remove_line(&mut self, line_id: &LineId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.line_id != line_id);
        self.lines.len() != before
    }

    /// Change a line's option selection.
    ///
    /// If the new selection collides with another line of the same product,
    /// the two lines are merged into the other one. Returns the id of the
    /// line that now carries the quantity, or `None` if `line_id` is absent.
    pub fn rekey_line(
        &mut self,
        line_id: &LineId,
        selected_options: SelectedOptions,
        options_pricing: Option<OptionsPricing>,
    ) -> Option<LineId> {
        let idx = self.lines.iter().position(|l| &l.line_id == line_id)?;
        let product_id = self.lines.get(idx)?.product_id;
        let new_key = VariantKey::resolve(product_id, Some(&selected_options));

        let collision = self
            .lines
            .iter()
            .enumerate()
            .find(|(i, l)| *i != idx && l.variant_key() == new_key)
            .map(|(i, _)| i);

        if let Some(target) = collision {
            let moved = self.lines.remove(idx);
            let target = if target > idx { target - 1 } else { target };
            let survivor = self.lines.get_mut(target)?;
            survivor.quantity = survivor.quantity.saturating_add(moved.quantity);
            return Some(survivor.line_id.clone());
        }

        let line = self.lines.get_mut(idx)?;
        line.selected_options = selected_options;
        if let Some(pricing) = options_pricing {
            line.options_pricing = pricing;
        }
        Some(line.line_id.clone())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl From<Vec<CartLine>> for Cart {
    /// Build a cart, dropping zero-quantity lines and merging duplicate variants.
    fn from(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines.into_iter().filter(|l| l.quantity > 0) {
            cart.merge_line(line);
        }
        cart
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn jacket(quantity: u32, size: &str) -> CartLine {
        CartLine::new(
            ProductId::new(42),
            quantity,
            SelectedOptions::new().with("size", size),
            LineSnapshot::capture("Jacket", Some(Decimal::new(150, 0)), None),
        )
    }

    #[test]
    fn test_merge_same_variant_increments() {
        let mut cart = Cart::new();
        let first = cart.merge_line(jacket(2, "L"));
        let second = cart.merge_line(jacket(1, "L"));

        assert!(matches!(first, MergeOutcome::Inserted(_)));
        assert_eq!(second, MergeOutcome::Incremented(first.line_id().clone()));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_merge_distinct_variants() {
        let mut cart = Cart::new();
        cart.merge_line(jacket(1, "M"));
        cart.merge_line(jacket(1, "L"));
        assert_eq!(cart.lines_for(ProductId::new(42)).count(), 2);
    }

    #[test]
    fn test_merge_backfills_snapshot() {
        let mut cart = Cart::new();
        let mut bare = jacket(1, "L");
        bare.snapshot.price = None;
        cart.merge_line(bare);
        cart.merge_line(jacket(1, "L"));
        assert_eq!(cart.lines()[0].snapshot.price, Some(Decimal::new(150, 0)));
    }

    #[test]
    fn test_totals_include_option_deltas() {
        let mut line = jacket(2, "L");
        line.options_pricing = OptionsPricing::new().with("size", Decimal::new(10, 0));
        let cart = Cart::from(vec![line]);

        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.subtotal(), Decimal::new(320, 0));
    }

    #[test]
    fn test_rekey_merges_on_collision() {
        let mut cart = Cart::new();
        let m = cart.merge_line(jacket(1, "M")).line_id().clone();
        let l = cart.merge_line(jacket(2, "L")).line_id().clone();

        let survivor = cart
            .rekey_line(&m, SelectedOptions::new().with("size", "L"), None)
            .unwrap();

        assert_eq!(survivor, l);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_rekey_without_collision_updates_in_place() {
        let mut cart = Cart::new();
        let m = cart.merge_line(jacket(1, "M")).line_id().clone();
        let survivor = cart
            .rekey_line(&m, SelectedOptions::new().with("size", "S"), None)
            .unwrap();

        assert_eq!(survivor, m);
        assert_eq!(cart.lines()[0].selected_options.get("size"), Some("S"));
    }

    #[test]
    fn test_replace_variant_overwrites_quantity() {
        let mut cart = Cart::from(vec![jacket(1, "L"), jacket(1, "M")]);
        let mut confirmed = jacket(5, "L");
        confirmed.line_id = LineId::from("srv-9");

        let id = cart.replace_variant(confirmed);

        assert_eq!(id.as_str(), "srv-9");
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.lines()[0].quantity, 5);
        assert_eq!(cart.lines()[0].line_id.as_str(), "srv-9");
    }

    #[test]
    fn test_deserialize_normalizes_duplicates() {
        let json = r#"[
            {"lineId": "a", "productId": 42, "quantity": 1, "selectedOptions": {"size": "L"}},
            {"lineId": "b", "productId": 42, "quantity": 2, "selectedOptions": {"size": "L"}},
            {"lineId": "c", "productId": 7, "quantity": 0}
        ]"#;
        let cart: Cart = serde_json::from_str(json).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].line_id.as_str(), "a");
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_serializes_as_array() {
        let cart = Cart::from(vec![jacket(2, "L")]);
        let value = serde_json::to_value(&cart).unwrap();

        assert!(value.is_array());
        assert_eq!(value[0]["productId"], 42);
        assert_eq!(value[0]["selectedOptions"]["size"], "L");
    }

    #[test]
    fn test_attachments_preserve_unknown_fields() {
        let json = r#"{"text": "Happy birthday", "images": ["a.png"], "font": "serif"}"#;
        let attachments: Attachments = serde_json::from_str(json).unwrap();

        assert_eq!(attachments.text.as_deref(), Some("Happy birthday"));
        assert_eq!(attachments.extra.get("font").unwrap(), "serif");
        let back = serde_json::to_value(&attachments).unwrap();
        assert_eq!(back["font"], "serif");
    }
}
