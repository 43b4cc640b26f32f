//! Naked Pineapple Commerce Core - Shared types library.
//!
//! This crate provides the types shared by the commerce synchronizer and its
//! callers:
//! - `sync` - Cart/wishlist synchronizer, local mirror, invalidation bus
//! - `cli` - Command-line driver for the synchronizer
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. Variant key resolution lives here so every tier that
//! merges cart lines uses the exact same identity.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, variant keys, cart lines, wishlists, identity

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
