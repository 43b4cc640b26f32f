//! Wishlist membership.
//!
//! A wishlist is a set of product ids: no quantities, no variants. Order of
//! insertion is kept for display.

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A single wishlisted product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product_id: ProductId,
}

/// A shopper's wishlist. Each product appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<WishlistEntry>", into = "Vec<WishlistEntry>")]
pub struct Wishlist {
    entries: Vec<WishlistEntry>,
}

impl Wishlist {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.entries.iter().any(|e| e.product_id == product_id)
    }

    /// Add a product. Returns `false` if it was already present.
    pub fn insert(&mut self, product_id: ProductId) -> bool {
        if self.contains(product_id) {
            return false;
        }
        self.entries.push(WishlistEntry { product_id });
        true
    }

    /// Remove a product. Returns `false` if it was not present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.product_id != product_id);
        self.entries.len() != before
    }

    #[must_use]
    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.entries.iter().map(|e| e.product_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<WishlistEntry>> for Wishlist {
    fn from(entries: Vec<WishlistEntry>) -> Self {
        entries.into_iter().map(|e| e.product_id).collect()
    }
}

impl From<Wishlist> for Vec<WishlistEntry> {
    fn from(wishlist: Wishlist) -> Self {
        wishlist.entries
    }
}

impl FromIterator<ProductId> for Wishlist {
    fn from_iter<I: IntoIterator<Item = ProductId>>(iter: I) -> Self {
        let mut wishlist = Self::new();
        for id in iter {
            wishlist.insert(id);
        }
        wishlist
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut wishlist = Wishlist::new();
        assert!(wishlist.insert(ProductId::new(7)));
        assert!(!wishlist.insert(ProductId::new(7)));
        assert_eq!(wishlist.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut wishlist = Wishlist::new();
        assert!(!wishlist.remove(ProductId::new(7)));
        assert!(wishlist.is_empty());
    }

    #[test]
    fn test_deserialize_dedupes() {
        let wishlist: Wishlist =
            serde_json::from_str(r#"[{"productId": 7}, {"productId": 8}, {"productId": 7}]"#)
                .unwrap();
        assert_eq!(
            wishlist.product_ids().collect::<Vec<_>>(),
            vec![ProductId::new(7), ProductId::new(8)]
        );
    }
}
