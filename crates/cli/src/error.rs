//! CLI error type.

use furnish_flow_core::{ProductId, ReviewError, UserKeyError};
use furnish_flow_storefront::catalog::CatalogError;
use furnish_flow_storefront::config::ConfigError;
use furnish_flow_storefront::error::StateError;
use furnish_flow_storefront::state::StartupError;
use furnish_flow_storefront::visualizer::VisualizerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Startup(#[from] StartupError),

    #[error("{}", .0.user_message())]
    State(#[from] StateError),

    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("visualizer: {0}")]
    Visualizer(#[from] VisualizerError),

    #[error("invalid --user: {0}")]
    InvalidUser(#[from] UserKeyError),

    #[error("review not accepted: {0}")]
    Review(#[from] ReviewError),

    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
