//! Variant identity for cart lines.
//!
//! Two cart additions are "the same line" when they reference the same
//! product with the same option selections. [`VariantKey::resolve`] turns
//! that pair into a stable string so both the remote merge step and the
//! local-cache merge step dedupe identically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Errors that can occur when parsing a `name=value` option pair.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionParseError {
    /// The input does not contain an `=` separator.
    #[error("option must be written as name=value (got '{0}')")]
    MissingSeparator(String),
    /// The option name is empty.
    #[error("option name cannot be empty")]
    EmptyName,
}

/// Option selections for a cart line (e.g. `size -> L`, `color -> Blue`).
///
/// Backed by a `BTreeMap`, so insertion order never affects equality,
/// serialization, or the resolved [`VariantKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedOptions(BTreeMap<String, String>);

impl SelectedOptions {
    /// Create an empty selection (the "no variant" case).
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a selection.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up the selected value for an option.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate selections in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a `name=value` pair, as typed on the command line.
    ///
    /// # Errors
    ///
    /// Returns an error if the separator is missing or the name is empty.
    pub fn parse_pair(pair: &str) -> Result<(String, String), OptionParseError> {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| OptionParseError::MissingSeparator(pair.to_owned()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(OptionParseError::EmptyName);
        }
        Ok((name.to_owned(), value.trim().to_owned()))
    }

    /// Canonical encoding: JSON object with keys in sorted order.
    fn canonical(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SelectedOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Deterministic identity of a (product, option selection) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey(String);

impl VariantKey {
    /// Resolve the variant key for a product and its selected options.
    ///
    /// An absent selection and an empty selection resolve to the same key.
    #[must_use]
    pub fn resolve(product_id: ProductId, options: Option<&SelectedOptions>) -> Self {
        let encoded = options
            .filter(|o| !o.is_empty())
            .map_or_else(|| "{}".to_owned(), SelectedOptions::canonical);
        Self(format!("{product_id}:{encoded}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ::core::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_irrelevant() {
        let a = SelectedOptions::new().with("size", "L").with("color", "Blue");
        let b = SelectedOptions::new().with("color", "Blue").with("size", "L");
        assert_eq!(
            VariantKey::resolve(ProductId::new(5), Some(&a)),
            VariantKey::resolve(ProductId::new(5), Some(&b))
        );
    }

    #[test]
    fn test_empty_and_absent_share_key() {
        let empty = SelectedOptions::new();
        assert_eq!(
            VariantKey::resolve(ProductId::new(5), Some(&empty)),
            VariantKey::resolve(ProductId::new(5), None)
        );
    }

    #[test]
    fn test_distinct_values_distinct_keys() {
        let m = SelectedOptions::new().with("size", "M");
        let l = SelectedOptions::new().with("size", "L");
        assert_ne!(
            VariantKey::resolve(ProductId::new(5), Some(&m)),
            VariantKey::resolve(ProductId::new(5), Some(&l))
        );
    }

    #[test]
    fn test_product_is_part_of_key() {
        let m = SelectedOptions::new().with("size", "M");
        assert_ne!(
            VariantKey::resolve(ProductId::new(5), Some(&m)),
            VariantKey::resolve(ProductId::new(6), Some(&m))
        );
    }

    #[test]
    fn test_separator_characters_do_not_collide() {
        // "a=b" -> "c" must not look like "a" -> "b=c"
        let first = SelectedOptions::new().with("a=b", "c");
        let second = SelectedOptions::new().with("a", "b=c");
        assert_ne!(
            VariantKey::resolve(ProductId::new(1), Some(&first)),
            VariantKey::resolve(ProductId::new(1), Some(&second))
        );
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            SelectedOptions::parse_pair("size=L").unwrap(),
            ("size".to_owned(), "L".to_owned())
        );
        assert_eq!(
            SelectedOptions::parse_pair("size"),
            Err(OptionParseError::MissingSeparator("size".to_owned()))
        );
        assert_eq!(
            SelectedOptions::parse_pair(" =L"),
            Err(OptionParseError::EmptyName)
        );
    }
}
