//! Wishlist state container.
//!
//! A set of saved products for a signed-in shopper, persisted under the
//! `wishlist:user:*` key. Anonymous shoppers have an empty wishlist that
//! cannot be changed and is never stored.

use furnish_flow_core::{CollectionKind, Identity, Product, ProductId, WishlistEntry};
use tracing::{debug, warn};

use crate::binding::{Binding, LoadTicket};
use crate::bridge::Bridge;
use crate::error::{Result, StateError};

/// Outcome of [`Wishlist::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// The shopper's wishlist.
#[derive(Debug)]
pub struct Wishlist {
    bridge: Bridge,
    binding: Binding,
    entries: Vec<WishlistEntry>,
}

impl Wishlist {
    /// An empty wishlist bound to the anonymous identity.
    #[must_use]
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            binding: Binding::new(CollectionKind::Wishlist),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.entries.iter().any(|e| e.product_id == product_id)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        self.binding.identity()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.binding.is_loading()
    }

    /// Save `product`. Returns `false` if it was already saved.
    ///
    /// # Errors
    ///
    /// Returns `StateError::UnauthenticatedMutation` for anonymous shoppers
    /// and `StateError::RebindPending` while reloading.
    pub fn add_item(&mut self, product: &Product) -> Result<bool> {
        self.ensure_writable()?;
        if self.contains(product.id) {
            return Ok(false);
        }
        self.entries.push(WishlistEntry::from_product(product));
        debug!(product_id = %product.id, "Added to wishlist");
        self.commit();
        Ok(true)
    }

    /// Remove `product_id`. Returns `false` if it was not saved.
    ///
    /// # Errors
    ///
    /// Returns `StateError::RebindPending` while reloading.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<bool> {
        self.binding.ensure_ready()?;
        let before = self.entries.len();
        self.entries.retain(|e| e.product_id != product_id);
        if self.entries.len() == before {
            return Ok(false);
        }
        self.commit();
        Ok(true)
    }

    /// Save `product` if absent, otherwise remove it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_item`].
    pub fn toggle(&mut self, product: &Product) -> Result<Toggle> {
        self.ensure_writable()?;
        if self.remove_item(product.id)? {
            Ok(Toggle::Removed)
        } else {
            self.add_item(product)?;
            Ok(Toggle::Added)
        }
    }

    /// Rebind to `identity`; see [`crate::cart::Cart::begin_rebind`].
    pub fn begin_rebind(&mut self, identity: Identity) -> LoadTicket {
        self.entries.clear();
        self.binding.begin(identity)
    }

    /// Install `entries` loaded for `ticket`, dropping duplicates.
    ///
    /// Returns `false` for a superseded ticket.
    pub fn finish_rebind(&mut self, ticket: &LoadTicket, entries: Vec<WishlistEntry>) -> bool {
        if !self.binding.accept(ticket) {
            debug!(identity = %ticket.identity(), "Discarding stale wishlist load");
            return false;
        }
        self.entries = WishlistEntry::dedupe(entries);
        true
    }

    fn ensure_writable(&self) -> Result<()> {
        self.binding.ensure_ready()?;
        if self.binding.identity().is_anonymous() {
            return Err(StateError::UnauthenticatedMutation);
        }
        Ok(())
    }

    fn commit(&self) {
        let Some(key) = self.binding.key() else {
            return;
        };
        if let Err(e) = self.bridge.save(key, &self.entries) {
            warn!(key = %key, error = %e, "Wishlist changes kept in memory only");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use furnish_flow_core::UserKey;
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::MemoryStorage;

    fn product(id: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Decimal::new(19_900, 2),
            images: Vec::new(),
            category: "tables".to_string(),
            specs: BTreeMap::new(),
            stock: 3,
            reviews: Vec::new(),
        }
    }

    fn user(id: &str) -> Identity {
        Identity::from(UserKey::parse(id).unwrap())
    }

    fn signed_in(storage: &MemoryStorage) -> Wishlist {
        let mut wishlist = Wishlist::new(Bridge::spawn(storage.clone()));
        let ticket = wishlist.begin_rebind(user("a"));
        assert!(wishlist.finish_rebind(&ticket, Vec::new()));
        wishlist
    }

    #[tokio::test]
    async fn test_anonymous_cannot_add() {
        let mut wishlist = Wishlist::new(Bridge::spawn(MemoryStorage::new()));
        let err = wishlist.add_item(&product(1)).unwrap_err();
        assert!(matches!(err, StateError::UnauthenticatedMutation));
        assert!(matches!(
            wishlist.toggle(&product(1)),
            Err(StateError::UnauthenticatedMutation)
        ));
        assert_eq!(wishlist.count(), 0);
    }

    #[tokio::test]
    async fn test_add_twice_keeps_one_entry() {
        let storage = MemoryStorage::new();
        let mut wishlist = signed_in(&storage);
        assert!(wishlist.add_item(&product(1)).unwrap());
        assert!(!wishlist.add_item(&product(1)).unwrap());
        assert_eq!(wishlist.count(), 1);
        assert!(wishlist.contains(ProductId::new(1)));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let storage = MemoryStorage::new();
        let mut wishlist = signed_in(&storage);
        wishlist.add_item(&product(1)).unwrap();
        assert!(wishlist.remove_item(ProductId::new(1)).unwrap());
        assert!(!wishlist.remove_item(ProductId::new(1)).unwrap());
        assert_eq!(wishlist.count(), 0);
    }

    #[tokio::test]
    async fn test_toggle() {
        let storage = MemoryStorage::new();
        let mut wishlist = signed_in(&storage);
        assert_eq!(wishlist.toggle(&product(4)).unwrap(), Toggle::Added);
        assert_eq!(wishlist.toggle(&product(4)).unwrap(), Toggle::Removed);
        assert!(!wishlist.contains(ProductId::new(4)));
    }

    #[tokio::test]
    async fn test_persists_under_user_key() {
        let storage = MemoryStorage::new();
        let mut wishlist = signed_in(&storage);
        wishlist.add_item(&product(1)).unwrap();
        wishlist.add_item(&product(2)).unwrap();
        wishlist.bridge.flush().await.unwrap();

        let key = wishlist.binding.key().unwrap().clone();
        assert_eq!(key.as_str(), "wishlist:user:a");
        assert_eq!(storage.snapshot(&key).unwrap().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sign_out_empties_without_writing() {
        let storage = MemoryStorage::new();
        let mut wishlist = signed_in(&storage);
        wishlist.add_item(&product(1)).unwrap();
        wishlist.bridge.flush().await.unwrap();

        let ticket = wishlist.begin_rebind(Identity::Anonymous);
        assert!(ticket.key().is_none());
        assert!(wishlist.finish_rebind(&ticket, Vec::new()));
        assert_eq!(wishlist.count(), 0);

        // The signed-in user's saved list is untouched
        wishlist.bridge.flush().await.unwrap();
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_rebind_dedupes() {
        let mut wishlist = Wishlist::new(Bridge::spawn(MemoryStorage::new()));
        let ticket = wishlist.begin_rebind(user("a"));
        let entry = WishlistEntry::from_product(&product(1));
        assert!(wishlist.finish_rebind(&ticket, vec![entry.clone(), entry]));
        assert_eq!(wishlist.count(), 1);
    }
}
