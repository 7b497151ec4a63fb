//! Cart commands.

use furnish_flow_core::{Price, ProductId};
use furnish_flow_storefront::cart::QuantityChange;
use furnish_flow_storefront::session::ShopSession;
use tracing::info;

use crate::error::CliError;

pub fn update(session: &mut ShopSession, id: ProductId, quantity: i64) -> Result<(), CliError> {
    match session.cart_mut().update_quantity(id, quantity)? {
        QuantityChange::Updated => info!(product_id = %id, quantity, "Quantity updated"),
        QuantityChange::Removed => info!(product_id = %id, "Removed from cart"),
        QuantityChange::NotFound => info!(product_id = %id, "Not in cart, nothing to update"),
    }
    Ok(())
}

pub fn remove(session: &mut ShopSession, id: ProductId) -> Result<(), CliError> {
    if session.cart_mut().remove_item(id)?.is_none() {
        info!(product_id = %id, "Not in cart");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn show(session: &ShopSession) {
    let cart = session.cart();
    println!("Cart ({})", session.identity());

    if cart.is_empty() {
        println!("  Your cart is empty.");
        return;
    }

    for item in cart.items() {
        println!(
            "  [{}] {} x{} @ {} = {}",
            item.product_id,
            item.name,
            item.quantity,
            item.price(),
            Price::usd(item.line_total()),
        );
    }
    println!(
        "  {} item(s), total {}",
        cart.total_item_count(),
        Price::usd(cart.total_price())
    );
}
