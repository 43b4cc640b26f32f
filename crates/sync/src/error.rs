//! Error taxonomy for cart, wishlist and catalog operations.
//!
//! Only [`CartError::InvalidQuantity`] ever reaches a caller as an `Err`.
//! Remote and cache failures are recovered by the local tier and returned as
//! notices inside a successful [`SyncReport`], after being logged.

use np_commerce_core::{LineId, ProductId};
use thiserror::Error;

use crate::remote::RemoteError;

/// Cart operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity below 1. Raised before any I/O.
    #[error("Quantity must be at least 1 (got {0})")]
    InvalidQuantity(u32),

    /// Stock hint says the product is sold out. The line is still added.
    #[error("Product {0} appears to be out of stock")]
    ProductUnavailable(ProductId),

    /// The remote store could not be reached; the local mirror was used.
    #[error("Remote cart unreachable: {0}")]
    RemoteUnreachable(String),

    /// The cached cart was unreadable and treated as empty.
    #[error("Malformed cart cache: {0}")]
    MalformedCache(String),

    /// The operation has no anonymous fallback.
    #[error("This operation requires a signed-in shopper")]
    IdentityRequired,
}

/// Wishlist operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WishlistError {
    /// The remote store could not be reached; the local mirror was used.
    #[error("Remote wishlist unreachable: {0}")]
    RemoteUnreachable(String),

    /// The cached wishlist was unreadable and treated as empty.
    #[error("Malformed wishlist cache: {0}")]
    MalformedCache(String),

    /// The operation has no anonymous fallback.
    #[error("This operation requires a signed-in shopper")]
    IdentityRequired,
}

/// Catalog read errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Remote call failed and nothing (not even stale) was cached.
    #[error("Catalog unavailable: {0}")]
    Remote(#[from] RemoteError),

    /// Response did not match the expected shape.
    #[error("Unexpected catalog payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Which tier ended up holding the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTier {
    /// The authoritative remote store accepted the write (mirror updated too).
    Remote,
    /// Only the local mirror was written.
    LocalCache,
}

/// Outcome of a successful synchronizer operation.
///
/// `notices` lists the failures that were recovered locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport<E> {
    pub tier: StoreTier,
    /// The line created or updated, for cart operations that target one.
    pub line_id: Option<LineId>,
    pub notices: Vec<E>,
}

impl<E> SyncReport<E> {
    #[must_use]
    pub const fn new(tier: StoreTier) -> Self {
        Self {
            tier,
            line_id: None,
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_line(mut self, line_id: LineId) -> Self {
        self.line_id = Some(line_id);
        self
    }

    #[must_use]
    pub fn with_notices(mut self, notices: Vec<E>) -> Self {
        self.notices = notices;
        self
    }

    /// `true` when nothing had to be recovered.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.notices.is_empty()
    }
}

/// A read that walked the degradation ladder. Reads never fail; the worst
/// case is an empty value from the local tier with notices explaining why.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T, E> {
    pub value: T,
    pub tier: StoreTier,
    pub notices: Vec<E>,
}

impl<T, E> Fetched<T, E> {
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Cart operation result.
pub type CartResult = Result<SyncReport<CartError>, CartError>;

/// Wishlist operation result.
pub type WishlistResult = Result<SyncReport<WishlistError>, WishlistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        assert_eq!(
            CartError::InvalidQuantity(0).to_string(),
            "Quantity must be at least 1 (got 0)"
        );
        assert_eq!(
            CartError::ProductUnavailable(ProductId::new(9)).to_string(),
            "Product 9 appears to be out of stock"
        );
    }

    #[test]
    fn test_report_builders() {
        let report: SyncReport<CartError> = SyncReport::new(StoreTier::LocalCache)
            .with_line(LineId::from("l-1"))
            .with_notices(vec![CartError::RemoteUnreachable("offline".to_string())]);

        assert_eq!(report.line_id, Some(LineId::from("l-1")));
        assert!(!report.is_clean());
    }
}
