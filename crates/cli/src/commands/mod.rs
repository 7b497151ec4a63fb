//! Command implementations.
//!
//! Shopper commands run against an [`AppState`] built from configuration;
//! `--user` signs the session in before it is opened.

pub mod cart;
pub mod checkout;
pub mod migrate;
pub mod products;
pub mod visualize;
pub mod wishlist;

use furnish_flow_core::UserKey;
use furnish_flow_storefront::config::StorefrontConfig;
use furnish_flow_storefront::session::ShopSession;
use furnish_flow_storefront::state::AppState;
use tracing::warn;

use crate::error::CliError;

/// Build application state and apply the `--user` identity.
pub async fn connect(config: StorefrontConfig, user: Option<&str>) -> Result<AppState, CliError> {
    let state = AppState::new(config).await?;
    if let Some(user) = user {
        state.identity().sign_in(UserKey::parse(user)?);
    }
    Ok(state)
}

/// Wait for queued writes. A failed write is reported but does not fail the
/// command; the change was applied in memory.
pub async fn finish(session: &ShopSession) {
    if let Err(e) = session.flush().await {
        warn!(error = %e, "{}", e.user_message());
    }
}
