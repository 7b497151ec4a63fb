//! Persisted shopper collections: cart line items and wishlist entries.
//!
//! Both collections are stored as JSON arrays under a [`StorageKey`] derived
//! from the collection kind and the session [`Identity`]. Field names match
//! the storefront's historic client format (`id`, `name`, `price`, `image`).

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Identity, Price, Product, ProductId, Quantity};

/// One product-and-quantity entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    #[serde(rename = "image")]
    pub image_ref: String,
    pub quantity: Quantity,
}

impl LineItem {
    /// Snapshot a catalog product into a new cart line.
    #[must_use]
    pub fn from_product(product: &Product, quantity: Quantity) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            image_ref: product.image_ref().to_owned(),
            quantity,
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity.get())
    }

    /// Unit price in the storefront currency.
    #[must_use]
    pub const fn price(&self) -> Price {
        Price::usd(self.unit_price)
    }

    /// Merge lines that share a product id, keeping first-seen order.
    ///
    /// Quantities of duplicates are summed (saturating at the largest
    /// representable quantity). Used when rebuilding a cart from storage.
    #[must_use]
    pub fn merge_duplicates(items: Vec<Self>) -> Vec<Self> {
        let mut merged: Vec<Self> = Vec::with_capacity(items.len());
        for item in items {
            match merged.iter_mut().find(|m| m.product_id == item.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => merged.push(item),
            }
        }
        merged
    }
}

/// One saved-product reference in a wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(rename = "image")]
    pub image_ref: String,
}

impl WishlistEntry {
    /// Snapshot a catalog product into a wishlist entry.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            image_ref: product.image_ref().to_owned(),
        }
    }

    /// Drop entries whose product id was already seen, keeping the first.
    #[must_use]
    pub fn dedupe(entries: Vec<Self>) -> Vec<Self> {
        let mut kept: Vec<Self> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !kept.iter().any(|k| k.product_id == entry.product_id) {
                kept.push(entry);
            }
        }
        kept
    }
}

/// Which per-user collection a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Cart,
    Wishlist,
}

impl CollectionKind {
    /// Key namespace prefix.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable-storage key for one collection of one identity.
///
/// Only constructed through [`StorageKey::for_collection`]:
///
/// | kind     | identity    | key                  |
/// |----------|-------------|----------------------|
/// | cart     | anonymous   | `cart:anonymous`     |
/// | cart     | user `u`    | `cart:user:u`        |
/// | wishlist | anonymous   | *(none)*             |
/// | wishlist | user `u`    | `wishlist:user:u`    |
///
/// The `user:` segment keeps a user whose id is literally `anonymous` out of
/// the anonymous bucket.
///
/// ```
/// use furnish_flow_core::{CollectionKind, Identity, StorageKey, UserKey};
///
/// let user = Identity::from(UserKey::parse("abc").unwrap());
/// let key = StorageKey::for_collection(CollectionKind::Cart, &user).unwrap();
/// assert_eq!(key.as_str(), "cart:user:abc");
/// assert!(StorageKey::for_collection(CollectionKind::Wishlist, &Identity::Anonymous).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// Build the key for `kind` under `identity`, or `None` when that
    /// collection is not persisted for the identity.
    #[must_use]
    pub fn for_collection(kind: CollectionKind, identity: &Identity) -> Option<Self> {
        match (kind, identity) {
            (CollectionKind::Cart, Identity::Anonymous) => Some(Self(format!("{kind}:anonymous"))),
            (CollectionKind::Wishlist, Identity::Anonymous) => None,
            (_, Identity::User(user)) => Some(Self(format!("{kind}:user:{user}"))),
        }
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
