//! Furnish Flow CLI - shopper state, catalog, and database tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the storefront.client_state table
//! ff-cli migrate
//!
//! # Browse the catalog
//! ff-cli products list
//! ff-cli products search velvet
//!
//! # Work with a cart (anonymous unless --user is given)
//! ff-cli cart add 1 --quantity 2
//! ff-cli --user alice cart show
//! ff-cli --user alice checkout
//!
//! # Wishlists need a signed-in user
//! ff-cli --user alice wishlist toggle 3
//!
//! # Place a product into a photo of your room
//! ff-cli visualize --room living-room.jpg --product 1
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `products` - Browse the catalog and preview reviews
//! - `cart` - Show and change the cart
//! - `wishlist` - Show and change the wishlist
//! - `checkout` - Place the order for the cart
//! - `visualize` - Room visualizer

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use furnish_flow_core::ProductId;
use furnish_flow_storefront::config::StorefrontConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;

use error::CliError;

#[derive(Parser)]
#[command(name = "ff-cli")]
#[command(author, version, about = "Furnish Flow CLI tools")]
struct Cli {
    /// Act as this signed-in user instead of an anonymous shopper
    #[arg(short, long, global = true, env = "FURNISH_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show and change the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Place the order for everything in the cart
    Checkout,
    /// Composite a product into a photo of a room
    Visualize {
        /// Photo of the room
        #[arg(short, long)]
        room: PathBuf,

        /// Product to place
        #[arg(short, long)]
        product: ProductId,

        /// Furniture photo (file path or URL); defaults to the product's first image
        #[arg(short, long)]
        furniture: Option<String>,

        /// Where to write the result
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List every product
    List,
    /// List categories
    Categories,
    /// Products in a category
    Category {
        /// Category slug, e.g. `sofas`
        slug: String,
    },
    /// Search names, descriptions, and categories
    Search { query: String },
    /// Show one product with specs and reviews
    Show { id: ProductId },
    /// Validate a review and preview the new rating
    Review {
        id: ProductId,

        /// Star rating, 1-5
        #[arg(short, long, default_value_t = 0)]
        rating: u8,

        #[arg(short, long, default_value = "")]
        comment: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        id: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },
    /// Set a line's quantity (0 or less removes it)
    Update {
        id: ProductId,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { id: ProductId },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show the wishlist
    Show,
    /// Save a product
    Add { id: ProductId },
    /// Remove a saved product
    Remove { id: ProductId },
    /// Save if absent, otherwise remove
    Toggle { id: ProductId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env();
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "furnish_flow_storefront=info,ff_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        // Flush Sentry before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let user = cli.user.as_deref();

    match cli.command {
        Commands::Migrate => commands::migrate::run(&config).await?,
        Commands::Products { action } => {
            let state = commands::connect(config, user).await?;
            match action {
                ProductsAction::List => commands::products::list(&state).await?,
                ProductsAction::Categories => commands::products::categories(&state).await?,
                ProductsAction::Category { slug } => {
                    commands::products::by_category(&state, &slug).await?;
                }
                ProductsAction::Search { query } => {
                    commands::products::search(&state, &query).await?;
                }
                ProductsAction::Show { id } => commands::products::show(&state, id).await?,
                ProductsAction::Review {
                    id,
                    rating,
                    comment,
                } => commands::products::review(&state, id, rating, comment).await?,
            }
        }
        Commands::Cart { action } => {
            let state = commands::connect(config, user).await?;
            let mut session = state.open_session().await;
            match action {
                CartAction::Show => {}
                CartAction::Add { id, quantity } => {
                    session.add_to_cart(state.catalog(), id, quantity).await?;
                }
                CartAction::Update { id, quantity } => {
                    commands::cart::update(&mut session, id, quantity)?;
                }
                CartAction::Remove { id } => commands::cart::remove(&mut session, id)?,
                CartAction::Clear => session.cart_mut().clear()?,
            }
            commands::cart::show(&session);
            commands::finish(&session).await;
        }
        Commands::Wishlist { action } => {
            let state = commands::connect(config, user).await?;
            let mut session = state.open_session().await;
            match action {
                WishlistAction::Show => {}
                WishlistAction::Add { id } => {
                    commands::wishlist::add(&mut session, state.catalog(), id).await?;
                }
                WishlistAction::Remove { id } => commands::wishlist::remove(&mut session, id)?,
                WishlistAction::Toggle { id } => {
                    commands::wishlist::toggle(&mut session, state.catalog(), id).await?;
                }
            }
            commands::wishlist::show(&session);
            commands::finish(&session).await;
        }
        Commands::Checkout => {
            let state = commands::connect(config, user).await?;
            let mut session = state.open_session().await;
            commands::checkout::run(&mut session)?;
            commands::finish(&session).await;
        }
        Commands::Visualize {
            room,
            product,
            furniture,
            out,
        } => {
            let state = commands::connect(config, user).await?;
            commands::visualize::run(&state, &room, product, furniture.as_deref(), out).await?;
        }
    }
    Ok(())
}
