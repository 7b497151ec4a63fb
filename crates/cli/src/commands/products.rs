//! Catalog commands.

use chrono::Utc;
use furnish_flow_core::{Product, ProductId, ReviewDraft};
use furnish_flow_storefront::catalog::Catalog;
use furnish_flow_storefront::state::AppState;

use crate::error::CliError;

pub async fn list(state: &AppState) -> Result<(), CliError> {
    print_products(&state.catalog().list().await?);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn categories(state: &AppState) -> Result<(), CliError> {
    for category in state.catalog().categories().await? {
        println!("{:<10} {}", category.slug, category.name);
    }
    Ok(())
}

pub async fn by_category(state: &AppState, slug: &str) -> Result<(), CliError> {
    print_products(&state.catalog().by_category(slug).await?);
    Ok(())
}

pub async fn search(state: &AppState, query: &str) -> Result<(), CliError> {
    print_products(&state.catalog().search(query).await?);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn show(state: &AppState, id: ProductId) -> Result<(), CliError> {
    let product = find(state, id).await?;

    println!("{} [{}]", product.name, product.id);
    println!("{}", product.unit_price());
    println!();
    println!("{}", product.description);
    println!();
    for (name, value) in &product.specs {
        println!("  {name}: {value}");
    }
    println!("  Stock: {}", product.stock);
    println!();
    print_rating(&product);
    for review in &product.reviews {
        println!(
            "  {}/5 by {} on {}: {}",
            review.rating, review.author, review.date, review.comment
        );
    }
    Ok(())
}

/// Validate a review against the product and show the rating it would
/// produce. The catalog is read-only, so nothing is saved.
#[allow(clippy::print_stdout)]
pub async fn review(
    state: &AppState,
    id: ProductId,
    rating: u8,
    comment: String,
) -> Result<(), CliError> {
    let mut product = find(state, id).await?;
    let author = state.identity().current().user().map(ToString::to_string);

    let draft = ReviewDraft { rating, comment };
    let review_id = product.add_review(draft, author.as_deref(), Utc::now().date_naive())?;

    println!("Review {review_id} accepted (preview only).");
    print_rating(&product);
    Ok(())
}

async fn find(state: &AppState, id: ProductId) -> Result<Product, CliError> {
    state
        .catalog()
        .find_by_id(id)
        .await?
        .ok_or(CliError::UnknownProduct(id))
}

#[allow(clippy::print_stdout)]
fn print_rating(product: &Product) {
    match product.average_rating() {
        Some(average) => println!(
            "Rating: {average:.1}/5 from {} review(s)",
            product.reviews.len()
        ),
        None => println!("No reviews yet."),
    }
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found.");
        return;
    }
    for product in products {
        println!(
            "[{}] {:<28} {:>12}  {}",
            product.id,
            product.name,
            product.unit_price().display(),
            product.category
        );
    }
}
