//! Checkout command.

use furnish_flow_storefront::session::ShopSession;

use crate::error::CliError;

#[allow(clippy::print_stdout)]
pub fn run(session: &mut ShopSession) -> Result<(), CliError> {
    let confirmation = session.checkout()?;

    println!("Order placed!");
    println!("  Order:  {}", confirmation.order_id);
    println!("  Items:  {}", confirmation.item_count);
    println!("  Total:  {}", confirmation.total);
    println!("  Placed: {}", confirmation.placed_at.to_rfc3339());
    Ok(())
}
