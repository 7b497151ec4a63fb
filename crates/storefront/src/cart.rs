//! Cart state container.
//!
//! An ordered list of [`LineItem`]s, at most one per product, bound to the
//! session identity's `cart:*` storage key. Every mutation updates memory
//! first and then queues a write of the whole collection through the
//! [`Bridge`]. A failed write never rolls back memory.

use furnish_flow_core::{CollectionKind, Identity, LineItem, Product, ProductId, Quantity};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::binding::{Binding, LoadTicket};
use crate::bridge::Bridge;
use crate::error::Result;

/// Outcome of [`Cart::update_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// The line now holds the new quantity.
    Updated,
    /// The requested quantity was below 1, so the line was removed.
    Removed,
    /// No line for that product; nothing changed.
    NotFound,
}

/// The shopper's cart.
#[derive(Debug)]
pub struct Cart {
    bridge: Bridge,
    binding: Binding,
    items: Vec<LineItem>,
    total_item_count: u64,
    total_price: Decimal,
}

impl Cart {
    /// An empty cart bound to the anonymous identity.
    #[must_use]
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            binding: Binding::new(CollectionKind::Cart),
            items: Vec::new(),
            total_item_count: 0,
            total_price: Decimal::ZERO,
        }
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.get(product_id).is_some()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub const fn total_item_count(&self) -> u64 {
        self.total_item_count
    }

    /// Sum of `unit_price × quantity` over all lines.
    #[must_use]
    pub const fn total_price(&self) -> Decimal {
        self.total_price
    }

    /// Identity this cart is bound to.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        self.binding.identity()
    }

    /// Whether a reload for a new identity is still outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.binding.is_loading()
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing line for the product has its quantity increased; otherwise
    /// a new line is appended with the product's name, price, and first image.
    /// Stock levels are not checked.
    ///
    /// # Errors
    ///
    /// Returns `StateError::InvalidQuantity` below 1 and
    /// `StateError::RebindPending` while reloading. The cart is unchanged
    /// in both cases.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> Result<()> {
        self.binding.ensure_ready()?;
        let quantity = Quantity::new(quantity)?;

        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.id)
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => self.items.push(LineItem::from_product(product, quantity)),
        }

        debug!(product_id = %product.id, quantity = %quantity, "Added to cart");
        self.commit();
        Ok(())
    }

    /// Overwrite the quantity of the line for `product_id`.
    ///
    /// A quantity below 1 removes the line.
    ///
    /// # Errors
    ///
    /// Returns `StateError::InvalidQuantity` above the largest representable
    /// quantity and `StateError::RebindPending` while reloading.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) -> Result<QuantityChange> {
        self.binding.ensure_ready()?;

        if quantity < 1 {
            return Ok(match self.remove_item(product_id)? {
                Some(_) => QuantityChange::Removed,
                None => QuantityChange::NotFound,
            });
        }

        let quantity = Quantity::new(quantity)?;
        let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        else {
            return Ok(QuantityChange::NotFound);
        };
        existing.quantity = quantity;

        self.commit();
        Ok(QuantityChange::Updated)
    }

    /// Remove the line for `product_id`, returning it.
    ///
    /// Removing an absent product changes nothing and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `StateError::RebindPending` while reloading.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<Option<LineItem>> {
        self.binding.ensure_ready()?;

        let Some(position) = self
            .items
            .iter()
            .position(|item| item.product_id == product_id)
        else {
            return Ok(None);
        };
        let removed = self.items.remove(position);

        self.commit();
        Ok(Some(removed))
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `StateError::RebindPending` while reloading.
    pub fn clear(&mut self) -> Result<()> {
        self.binding.ensure_ready()?;
        self.items.clear();
        self.commit();
        Ok(())
    }

    /// Rebind to `identity`: empty the cart now and hand out a ticket for
    /// the load that will refill it.
    pub fn begin_rebind(&mut self, identity: Identity) -> LoadTicket {
        self.items.clear();
        self.recompute();
        self.binding.begin(identity)
    }

    /// Install `items` loaded for `ticket`.
    ///
    /// Returns `false` and discards `items` if a newer rebind has started
    /// since the ticket was issued. Duplicate lines are merged.
    pub fn finish_rebind(&mut self, ticket: &LoadTicket, items: Vec<LineItem>) -> bool {
        if !self.binding.accept(ticket) {
            debug!(identity = %ticket.identity(), "Discarding stale cart load");
            return false;
        }
        self.items = LineItem::merge_duplicates(items);
        self.recompute();
        true
    }

    fn commit(&mut self) {
        self.recompute();
        let Some(key) = self.binding.key() else {
            return;
        };
        if let Err(e) = self.bridge.save(key, &self.items) {
            warn!(key = %key, error = %e, "Cart changes kept in memory only");
        }
    }

    fn recompute(&mut self) {
        self.total_item_count = self
            .items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum();
        self.total_price = self.items.iter().map(LineItem::line_total).sum();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use furnish_flow_core::UserKey;
    use serde_json::json;

    use super::*;
    use crate::error::StateError;
    use crate::storage::MemoryStorage;

    fn product(id: i32, price: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Decimal::from_str(price).unwrap(),
            images: vec![format!("https://img.example/{id}.jpg")],
            category: "chairs".to_string(),
            specs: BTreeMap::new(),
            stock: 1,
            reviews: Vec::new(),
        }
    }

    fn user(id: &str) -> Identity {
        Identity::from(UserKey::parse(id).unwrap())
    }

    fn cart() -> (Cart, MemoryStorage) {
        let storage = MemoryStorage::new();
        (Cart::new(Bridge::spawn(storage.clone())), storage)
    }

    #[tokio::test]
    async fn test_add_same_product_merges() {
        let (mut cart, _) = cart();
        let sofa = product(1, "899.99");
        cart.add_item(&sofa, 2).unwrap();
        cart.add_item(&sofa, 3).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(sofa.id).unwrap().quantity.get(), 5);
        assert_eq!(cart.total_item_count(), 5);
    }

    #[tokio::test]
    async fn test_add_snapshots_product() {
        let (mut cart, _) = cart();
        cart.add_item(&product(7, "10.00"), 1).unwrap();
        let line = &cart.items()[0];
        assert_eq!(line.name, "Product 7");
        assert_eq!(line.image_ref, "https://img.example/7.jpg");
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_quantity() {
        let (mut cart, storage) = cart();
        let chair = product(2, "10.00");
        cart.add_item(&chair, 1).unwrap();

        let err = cart.add_item(&chair, 0).unwrap_err();
        assert!(matches!(err, StateError::InvalidQuantity(_)));
        assert!(cart.add_item(&chair, -4).is_err());
        assert_eq!(cart.total_item_count(), 1);

        cart.bridge.flush().await.unwrap();
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_totals_follow_mutations() {
        let (mut cart, _) = cart();
        let a = product(1, "899.99");
        let b = product(2, "1250.00");
        cart.add_item(&a, 2).unwrap();
        cart.add_item(&b, 1).unwrap();
        assert_eq!(cart.total_item_count(), 3);
        assert_eq!(cart.total_price(), Decimal::from_str("3049.98").unwrap());

        cart.remove_item(a.id).unwrap();
        assert_eq!(cart.total_item_count(), 1);
        assert_eq!(cart.total_price(), Decimal::from_str("1250.00").unwrap());
    }

    #[tokio::test]
    async fn test_update_quantity_outcomes() {
        let (mut cart, _) = cart();
        let a = product(1, "5.00");
        cart.add_item(&a, 2).unwrap();

        assert_eq!(cart.update_quantity(a.id, 4).unwrap(), QuantityChange::Updated);
        assert_eq!(cart.total_item_count(), 4);

        assert_eq!(
            cart.update_quantity(ProductId::new(99), 3).unwrap(),
            QuantityChange::NotFound
        );

        assert_eq!(cart.update_quantity(a.id, 0).unwrap(), QuantityChange::Removed);
        assert!(cart.is_empty());
        assert_eq!(cart.update_quantity(a.id, 0).unwrap(), QuantityChange::NotFound);
    }

    #[tokio::test]
    async fn test_remove_absent_leaves_cart_unchanged() {
        let (mut cart, _) = cart();
        let a = product(1, "5.00");
        cart.add_item(&a, 2).unwrap();
        let before = cart.items().to_vec();

        assert!(cart.remove_item(ProductId::new(42)).unwrap().is_none());
        assert_eq!(cart.items(), before.as_slice());
    }

    #[tokio::test]
    async fn test_mutations_persist_whole_collection() {
        let (mut cart, storage) = cart();
        cart.add_item(&product(1, "5.00"), 2).unwrap();
        cart.add_item(&product(2, "1.50"), 1).unwrap();
        cart.bridge.flush().await.unwrap();

        let key = cart.binding.key().unwrap().clone();
        assert_eq!(key.as_str(), "cart:anonymous");
        let stored = storage.snapshot(&key).unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 2);
        assert_eq!(stored[0]["id"], json!(1));
        assert_eq!(stored[0]["quantity"], json!(2));

        cart.clear().unwrap();
        cart.bridge.flush().await.unwrap();
        assert!(storage.snapshot(&key).is_none());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory() {
        let (mut cart, storage) = cart();
        storage.set_fail_writes(true);
        cart.add_item(&product(1, "5.00"), 2).unwrap();

        assert_eq!(cart.total_item_count(), 2);
        assert!(cart.bridge.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_rebind_clears_and_rejects_mutations() {
        let (mut cart, _) = cart();
        let a = product(1, "5.00");
        cart.add_item(&a, 2).unwrap();

        let ticket = cart.begin_rebind(user("b"));
        assert!(cart.is_empty());
        assert_eq!(cart.total_item_count(), 0);
        assert!(matches!(cart.add_item(&a, 1), Err(StateError::RebindPending)));

        assert!(cart.finish_rebind(&ticket, Vec::new()));
        assert!(cart.is_empty());
        cart.add_item(&a, 1).unwrap();
        assert_eq!(cart.identity(), &user("b"));
    }

    #[tokio::test]
    async fn test_stale_rebind_is_discarded() {
        let (mut cart, _) = cart();
        let a = product(1, "5.00");
        let stale = cart.begin_rebind(user("a"));
        let current = cart.begin_rebind(user("b"));

        let loaded = vec![LineItem::from_product(&a, Quantity::new(2).unwrap())];
        assert!(!cart.finish_rebind(&stale, loaded));
        assert!(cart.is_empty());
        assert!(cart.is_loading());

        assert!(cart.finish_rebind(&current, Vec::new()));
        assert!(!cart.is_loading());
    }

    #[tokio::test]
    async fn test_rebind_merges_duplicate_lines() {
        let (mut cart, _) = cart();
        let a = product(1, "5.00");
        let ticket = cart.begin_rebind(user("a"));
        let loaded = vec![
            LineItem::from_product(&a, Quantity::new(2).unwrap()),
            LineItem::from_product(&a, Quantity::new(3).unwrap()),
        ];
        assert!(cart.finish_rebind(&ticket, loaded));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_item_count(), 5);
    }

    #[tokio::test]
    async fn test_totals_track_long_mutation_sequence() {
        let (mut cart, _) = cart();
        let catalog: Vec<Product> = ["899.99", "1250.00", "650.00", "35.50", "0.99"]
            .iter()
            .zip(1..)
            .map(|(price, id)| product(id, price))
            .collect();
        let mut expected: BTreeMap<ProductId, (u64, Decimal)> = BTreeMap::new();

        // Fixed linear congruential sequence so every run sees the same steps
        let mut seed: u64 = 0x5eed;
        for step in 0..200 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let pick = usize::try_from((seed >> 33) % 5).unwrap();
            let item = catalog.get(pick).unwrap();
            let amount = i64::try_from((seed >> 40) % 7).unwrap() - 1;

            match (seed >> 20) % 3 {
                0 if amount >= 1 => {
                    cart.add_item(item, amount).unwrap();
                    let qty = u64::try_from(amount).unwrap();
                    expected.entry(item.id).or_insert((0, item.price)).0 += qty;
                }
                0 => {
                    assert!(cart.add_item(item, amount).is_err());
                }
                1 => {
                    let change = cart.update_quantity(item.id, amount).unwrap();
                    match (expected.contains_key(&item.id), amount >= 1) {
                        (true, true) => {
                            assert_eq!(change, QuantityChange::Updated);
                            if let Some(entry) = expected.get_mut(&item.id) {
                                entry.0 = u64::try_from(amount).unwrap();
                            }
                        }
                        (true, false) => {
                            assert_eq!(change, QuantityChange::Removed);
                            expected.remove(&item.id);
                        }
                        (false, _) => assert_eq!(change, QuantityChange::NotFound),
                    }
                }
                _ => {
                    let removed = cart.remove_item(item.id).unwrap();
                    assert_eq!(removed.is_some(), expected.remove(&item.id).is_some());
                }
            }

            let count: u64 = expected.values().map(|(qty, _)| qty).sum();
            let total: Decimal = expected
                .values()
                .map(|(qty, price)| *price * Decimal::from(*qty))
                .sum();
            assert_eq!(cart.total_item_count(), count, "item count after step {step}");
            assert_eq!(cart.total_price(), total, "total price after step {step}");
            assert_eq!(cart.len(), expected.len(), "line count after step {step}");
            let summed: u64 = cart.items().iter().map(|l| u64::from(l.quantity.get())).sum();
            assert_eq!(summed, count);
        }
    }
}
