//! Furnish Flow Core - Shared types library.
//!
//! This crate provides common types used across all Furnish Flow components:
//! - `storefront` - Cart/wishlist state, persistence bridge, catalog access
//! - `cli` - Command-line front end and database migrations
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, quantities, identities, products,
//!   reviews, and the persisted cart/wishlist records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
