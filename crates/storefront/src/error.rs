//! Unified error handling with Sentry integration.
//!
//! Provides the [`StateError`] type returned by cart, wishlist, and session
//! operations, plus helpers that keep Sentry's user context and breadcrumbs
//! in step with the shopper session.
//!
//! No error here is fatal: every failure leaves in-memory state either
//! unchanged or reset to empty.

use furnish_flow_core::{ProductId, QuantityError, UserKey};
use thiserror::Error;

use crate::catalog::CatalogError;

/// Error type for shopper-state operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// Durable storage could not be read or written. State continues
    /// in memory only.
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// Non-positive or non-numeric quantity. Prior state is retained.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// Wishlist mutation attempted without a signed-in user.
    #[error("Sign-in required")]
    UnauthenticatedMutation,

    /// Mutation attempted while the collection is reloading for a new
    /// identity.
    #[error("Collection is reloading for a new identity")]
    RebindPending,

    /// The catalog has no product with this id.
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    /// Checkout attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl StateError {
    /// Message suitable for showing to the shopper.
    ///
    /// Storage and catalog internals are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::PersistenceUnavailable(_) => {
                "Your changes are saved for this session only.".to_string()
            }
            Self::InvalidQuantity(_) => "Please enter a quantity of 1 or more.".to_string(),
            Self::UnauthenticatedMutation => {
                "You need to be signed in to add items to your wishlist.".to_string()
            }
            Self::RebindPending => "Still loading your saved items, please try again.".to_string(),
            Self::UnknownProduct(_) => "That product is no longer available.".to_string(),
            Self::EmptyCart => "Your cart is empty.".to_string(),
            Self::Catalog(_) => "Products could not be loaded. Please try again.".to_string(),
        }
    }
}

/// Result type alias for `StateError`.
pub type Result<T> = std::result::Result<T, StateError>;

/// Set the Sentry user context for a signed-in shopper.
///
/// Only the opaque user key is attached.
pub fn set_sentry_user(user: &UserKey) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
