//! Read-only product catalog.
//!
//! [`Catalog`] is the lookup seam used by the shop session. Two sources are
//! provided:
//!
//! - [`StaticCatalog`]: products held in memory, from JSON or the bundled
//!   seed data
//! - [`HttpCatalog`]: the storefront's `/api/products` endpoint, cached
//!
//! [`CatalogSource`] picks one at runtime.

mod http;
mod static_catalog;

use std::future::Future;

use furnish_flow_core::{Category, Product, ProductId};
use thiserror::Error;

pub use http::HttpCatalog;
pub use static_catalog::StaticCatalog;

/// Errors from catalog lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The product API answered with a non-success status.
    #[error("Product API returned {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Catalog JSON could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Base URL is not usable.
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Product lookups.
///
/// Implementors provide [`Catalog::list`] and [`Catalog::categories`]; the
/// remaining lookups filter the full listing.
pub trait Catalog: Send + Sync {
    /// Every product.
    fn list(&self) -> impl Future<Output = Result<Vec<Product>, CatalogError>> + Send;

    /// Every category.
    fn categories(&self) -> impl Future<Output = Result<Vec<Category>, CatalogError>> + Send;

    /// The product with `id`, if any.
    fn find_by_id(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, CatalogError>> + Send {
        async move { Ok(self.list().await?.into_iter().find(|p| p.id == id)) }
    }

    /// Products whose category slug is `slug`.
    fn by_category(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Vec<Product>, CatalogError>> + Send {
        async move {
            let mut products = self.list().await?;
            products.retain(|p| p.category == slug);
            Ok(products)
        }
    }

    /// Products matching `query` on name, description, or category.
    ///
    /// A blank query matches nothing.
    fn search(&self, query: &str) -> impl Future<Output = Result<Vec<Product>, CatalogError>> + Send {
        async move {
            if query.trim().is_empty() {
                return Ok(Vec::new());
            }
            let mut products = self.list().await?;
            products.retain(|p| p.matches(query));
            Ok(products)
        }
    }
}

/// Catalog chosen from configuration.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    Static(StaticCatalog),
    Http(HttpCatalog),
}

impl Catalog for CatalogSource {
    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        match self {
            Self::Static(catalog) => catalog.list().await,
            Self::Http(catalog) => catalog.list().await,
        }
    }

    async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        match self {
            Self::Static(catalog) => catalog.categories().await,
            Self::Http(catalog) => catalog.categories().await,
        }
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        match self {
            Self::Static(catalog) => catalog.find_by_id(id).await,
            Self::Http(catalog) => catalog.find_by_id(id).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let catalog = StaticCatalog::seed().unwrap();
        let hits = catalog.search("  VELVET ").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().unwrap().name, "Modern Velvet Sofa");
    }

    #[tokio::test]
    async fn test_search_matches_category_slug() {
        let catalog = StaticCatalog::seed().unwrap();
        let hits = catalog.search("beds").await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_search_matches_nothing() {
        let catalog = StaticCatalog::seed().unwrap();
        assert!(catalog.search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_by_category() {
        let catalog = CatalogSource::Static(StaticCatalog::seed().unwrap());
        let chairs = catalog.by_category("chairs").await.unwrap();
        let ids: Vec<i32> = chairs.iter().map(|p| p.id.as_i32()).collect();
        assert_eq!(ids, vec![2, 5]);
        assert!(catalog.by_category("lamps").await.unwrap().is_empty());
    }
}
