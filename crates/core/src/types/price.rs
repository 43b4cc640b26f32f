//! Price arithmetic for cart lines using decimal amounts.
//!
//! Product prices are captured in a line's snapshot; option selections may
//! add a delta on top (e.g. "+$5 for XXL"). Options without a configured
//! delta cost nothing extra.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::variant::SelectedOptions;

/// Additive price delta per option name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionsPricing(BTreeMap<String, Decimal>);

impl OptionsPricing {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, delta: Decimal) -> Self {
        self.0.insert(name.into(), delta);
        self
    }

    /// Delta configured for an option, zero when absent.
    #[must_use]
    pub fn delta(&self, name: &str) -> Decimal {
        self.0.get(name).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of the deltas for every option that is actually selected.
    #[must_use]
    pub fn delta_for(&self, selected: &SelectedOptions) -> Decimal {
        selected.iter().map(|(name, _)| self.delta(name)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Format an amount for display (e.g. `$19.99`).
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_defaults_to_zero() {
        let pricing = OptionsPricing::new();
        assert_eq!(pricing.delta("size"), Decimal::ZERO);
    }

    #[test]
    fn test_delta_for_only_counts_selected_options() {
        let pricing = OptionsPricing::new()
            .with("size", Decimal::new(500, 2))
            .with("engraving", Decimal::new(1000, 2));
        let selected = SelectedOptions::new().with("size", "XXL").with("color", "Red");

        assert_eq!(pricing.delta_for(&selected), Decimal::new(500, 2));
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Decimal::new(150, 0)), "$150.00");
        assert_eq!(format_price(Decimal::new(19_999, 3)), "$20.00");
    }
}
