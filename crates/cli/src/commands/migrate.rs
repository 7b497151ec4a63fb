//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! ff-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `FURNISH_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! Migrations live in `crates/storefront/migrations/`.

use furnish_flow_storefront::config::StorefrontConfig;
use furnish_flow_storefront::storage::postgres;

use crate::error::CliError;

/// Run storefront database migrations.
pub async fn run(config: &StorefrontConfig) -> Result<(), CliError> {
    let database_url = config
        .database_url
        .as_ref()
        .ok_or(CliError::NotConfigured("FURNISH_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    let pool = postgres::create_pool(database_url).await?;

    tracing::info!("Running storefront migrations...");
    postgres::migrate(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
