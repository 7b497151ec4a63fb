//! Furnish Flow storefront library.
//!
//! Shopper-side state for the storefront: the cart and wishlist containers,
//! the bridge that persists them per identity, catalog access, and the room
//! visualizer client. Binaries wire these together through [`state::AppState`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod binding;
pub mod bridge;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod session;
pub mod state;
pub mod storage;
pub mod visualizer;
pub mod wishlist;
