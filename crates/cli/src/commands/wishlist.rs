//! Wishlist commands.

use furnish_flow_core::{Price, ProductId};
use furnish_flow_storefront::catalog::Catalog;
use furnish_flow_storefront::session::ShopSession;
use furnish_flow_storefront::wishlist::Toggle;
use tracing::info;

use crate::error::CliError;

pub async fn add<C: Catalog>(
    session: &mut ShopSession,
    catalog: &C,
    id: ProductId,
) -> Result<(), CliError> {
    if !session.add_to_wishlist(catalog, id).await? {
        info!(product_id = %id, "Already in wishlist");
    }
    Ok(())
}

pub fn remove(session: &mut ShopSession, id: ProductId) -> Result<(), CliError> {
    if !session.wishlist_mut().remove_item(id)? {
        info!(product_id = %id, "Not in wishlist");
    }
    Ok(())
}

pub async fn toggle<C: Catalog>(
    session: &mut ShopSession,
    catalog: &C,
    id: ProductId,
) -> Result<(), CliError> {
    match session.toggle_wishlist(catalog, id).await? {
        Toggle::Added => info!(product_id = %id, "Added to wishlist"),
        Toggle::Removed => info!(product_id = %id, "Removed from wishlist"),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn show(session: &ShopSession) {
    let wishlist = session.wishlist();
    println!("Wishlist ({})", session.identity());

    if session.identity().is_anonymous() {
        println!("  Sign in (--user) to save products.");
        return;
    }
    if wishlist.count() == 0 {
        println!("  Your wishlist is empty.");
        return;
    }

    for entry in wishlist.entries() {
        println!(
            "  [{}] {} {}",
            entry.product_id,
            entry.name,
            Price::usd(entry.price)
        );
    }
}
