//! Core types for Furnish Flow.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod collection;
pub mod id;
pub mod identity;
pub mod price;
pub mod product;
pub mod quantity;
pub mod review;

pub use collection::{CollectionKind, LineItem, StorageKey, WishlistEntry};
pub use id::*;
pub use identity::{Identity, UserKey, UserKeyError};
pub use price::{CurrencyCode, Price};
pub use product::{Category, Product};
pub use quantity::{Quantity, QuantityError};
pub use review::{Review, ReviewDraft, ReviewError, average_rating};
