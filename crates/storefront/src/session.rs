//! The shopper session.
//!
//! [`ShopSession`] owns the cart and wishlist for one application session
//! and keeps them bound to the identity published by the
//! [`IdentityObserver`](crate::identity::IdentityObserver).
//!
//! # Identity changes
//!
//! On every transition both containers are emptied at once and reloaded for
//! the new identity. If the identity changes again before the reload
//! finishes, the reload is abandoned and restarted for the newest identity,
//! so a slow load for user A can never land in user B's session.

use chrono::{DateTime, Utc};
use furnish_flow_core::{Identity, LineItem, Price, Product, ProductId, WishlistEntry};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::bridge::Bridge;
use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::error::{Result, StateError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::wishlist::{Toggle, Wishlist};

/// Summary of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub item_count: u64,
    pub total: Price,
    pub placed_at: DateTime<Utc>,
}

enum Reload {
    Loaded(Vec<LineItem>, Vec<WishlistEntry>),
    Superseded,
}

/// Cart and wishlist for one shopper session.
#[derive(Debug)]
pub struct ShopSession {
    bridge: Bridge,
    identity_rx: watch::Receiver<Identity>,
    cart: Cart,
    wishlist: Wishlist,
}

impl ShopSession {
    /// Create both containers and load them for the current identity.
    pub async fn open(bridge: Bridge, identity_rx: watch::Receiver<Identity>) -> Self {
        let mut session = Self {
            cart: Cart::new(bridge.clone()),
            wishlist: Wishlist::new(bridge.clone()),
            bridge,
            identity_rx,
        };
        session.sync_identity().await;
        session
    }

    /// Rebind both containers to the current identity and reload them.
    ///
    /// Restarts whenever the identity changes mid-load; returns once the
    /// containers hold the collections of the newest identity.
    #[instrument(skip(self))]
    pub async fn sync_identity(&mut self) {
        let mut source_open = true;

        loop {
            let identity = self.identity_rx.borrow_and_update().clone();
            match identity.user() {
                Some(user) => set_sentry_user(user),
                None => clear_sentry_user(),
            }

            let cart_ticket = self.cart.begin_rebind(identity.clone());
            let wishlist_ticket = self.wishlist.begin_rebind(identity.clone());

            let bridge = self.bridge.clone();
            let mut load = std::pin::pin!(async {
                tokio::join!(
                    cart_ticket.fetch::<LineItem>(&bridge),
                    wishlist_ticket.fetch::<WishlistEntry>(&bridge),
                )
            });

            let reload = loop {
                tokio::select! {
                    (items, entries) = &mut load => break Reload::Loaded(items, entries),
                    changed = self.identity_rx.changed(), if source_open => {
                        if changed.is_ok() {
                            break Reload::Superseded;
                        }
                        // Sender dropped; the current identity is final
                        source_open = false;
                    }
                }
            };

            match reload {
                Reload::Loaded(items, entries) => {
                    self.cart.finish_rebind(&cart_ticket, items);
                    self.wishlist.finish_rebind(&wishlist_ticket, entries);
                    info!(
                        identity = %identity,
                        cart_items = self.cart.len(),
                        wishlist_items = self.wishlist.count(),
                        "Session bound to identity"
                    );
                    return;
                }
                Reload::Superseded => {
                    debug!(identity = %identity, "Identity changed while loading, restarting");
                }
            }
        }
    }

    /// Wait for the next identity transition and rebind to it.
    ///
    /// Returns `false` once the identity source is gone.
    pub async fn next_identity_change(&mut self) -> bool {
        if self.identity_rx.changed().await.is_err() {
            return false;
        }
        self.sync_identity().await;
        true
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        self.cart.identity()
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    #[must_use]
    pub const fn wishlist(&self) -> &Wishlist {
        &self.wishlist
    }

    pub const fn wishlist_mut(&mut self) -> &mut Wishlist {
        &mut self.wishlist
    }

    /// Look up `product_id` and add `quantity` units to the cart.
    ///
    /// # Errors
    ///
    /// Returns `StateError::UnknownProduct` if the catalog has no such
    /// product, `StateError::Catalog` if the lookup fails, and the errors of
    /// [`Cart::add_item`].
    pub async fn add_to_cart<C: Catalog>(
        &mut self,
        catalog: &C,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<()> {
        let product = resolve(catalog, product_id).await?;
        self.cart.add_item(&product, quantity)?;

        let id = product_id.to_string();
        let quantity = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Added item",
            Some(&[("product_id", id.as_str()), ("quantity", quantity.as_str())]),
        );
        Ok(())
    }

    /// Look up `product_id` and save it to the wishlist.
    ///
    /// Returns `false` if it was already saved.
    ///
    /// # Errors
    ///
    /// Returns `StateError::UnknownProduct`, `StateError::Catalog`, or the
    /// errors of [`Wishlist::add_item`].
    pub async fn add_to_wishlist<C: Catalog>(
        &mut self,
        catalog: &C,
        product_id: ProductId,
    ) -> Result<bool> {
        let product = resolve(catalog, product_id).await?;
        let added = self.wishlist.add_item(&product)?;

        let id = product_id.to_string();
        add_breadcrumb("wishlist", "Added item", Some(&[("product_id", id.as_str())]));
        Ok(added)
    }

    /// Look up `product_id` and toggle it in the wishlist.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_to_wishlist`].
    pub async fn toggle_wishlist<C: Catalog>(
        &mut self,
        catalog: &C,
        product_id: ProductId,
    ) -> Result<Toggle> {
        let product = resolve(catalog, product_id).await?;
        let toggle = self.wishlist.toggle(&product)?;

        let id = product_id.to_string();
        let message = match toggle {
            Toggle::Added => "Added item",
            Toggle::Removed => "Removed item",
        };
        add_breadcrumb("wishlist", message, Some(&[("product_id", id.as_str())]));
        Ok(toggle)
    }

    /// Place the order for everything in the cart and empty it.
    ///
    /// Nothing about the order is stored.
    ///
    /// # Errors
    ///
    /// Returns `StateError::EmptyCart` if there is nothing to order and
    /// `StateError::RebindPending` while reloading.
    pub fn checkout(&mut self) -> Result<OrderConfirmation> {
        if self.cart.is_loading() {
            return Err(StateError::RebindPending);
        }
        if self.cart.is_empty() {
            return Err(StateError::EmptyCart);
        }

        let confirmation = OrderConfirmation {
            order_id: Uuid::new_v4(),
            item_count: self.cart.total_item_count(),
            total: Price::usd(self.cart.total_price()),
            placed_at: Utc::now(),
        };
        self.cart.clear()?;

        info!(
            order_id = %confirmation.order_id,
            item_count = confirmation.item_count,
            total = %confirmation.total,
            "Order placed"
        );
        add_breadcrumb("checkout", "Placed order", None);
        Ok(confirmation)
    }

    /// Wait for queued writes to reach storage.
    ///
    /// # Errors
    ///
    /// Returns `StateError::PersistenceUnavailable` if any collection's latest
    /// write failed.
    pub async fn flush(&self) -> Result<()> {
        self.bridge.flush().await
    }

    /// Whether some changes currently exist only in memory.
    #[must_use]
    pub fn persistence_degraded(&self) -> bool {
        self.bridge.is_degraded()
    }
}

async fn resolve<C: Catalog>(catalog: &C, product_id: ProductId) -> Result<Product> {
    catalog
        .find_by_id(product_id)
        .await?
        .ok_or(StateError::UnknownProduct(product_id))
}
