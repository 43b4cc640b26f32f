//! Core types for the commerce synchronizer.
//!
//! This module provides type-safe wrappers for cart and wishlist concepts.

pub mod cart;
pub mod id;
pub mod identity;
pub mod price;
pub mod variant;
pub mod wishlist;

pub use cart::{Attachments, Cart, CartLine, LineSnapshot, MergeOutcome};
pub use id::*;
pub use identity::Identity;
pub use price::{OptionsPricing, format_price};
pub use variant::{OptionParseError, SelectedOptions, VariantKey};
pub use wishlist::{Wishlist, WishlistEntry};
