//! Catalog backed by the storefront product API.
//!
//! `GET {base}/api/products` returns every product as a JSON array. The
//! listing is cached for 5 minutes; individual lookups filter the cached
//! listing.

use std::sync::Arc;
use std::time::Duration;

use furnish_flow_core::{Category, Product};
use moka::future::Cache;
use tracing::{debug, instrument};
use url::Url;

use super::{Catalog, CatalogError};

const PRODUCTS_PATH: &str = "api/products";

/// Client for the product API.
#[derive(Clone)]
pub struct HttpCatalog {
    inner: Arc<HttpCatalogInner>,
}

struct HttpCatalogInner {
    client: reqwest::Client,
    endpoint: Url,
    categories: Vec<Category>,
    cache: Cache<(), Arc<Vec<Product>>>,
}

impl std::fmt::Debug for HttpCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalog")
            .field("endpoint", &self.inner.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpCatalog {
    /// Create a client for the API rooted at `base`.
    ///
    /// The product API has no category listing, so `categories` is served
    /// as given.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidUrl` if `base` cannot be joined with the
    /// products path.
    pub fn new(base: &Url, categories: Vec<Category>) -> Result<Self, CatalogError> {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        // Treat the base as a directory so `/shop` becomes `/shop/api/products`
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let endpoint = base.join(PRODUCTS_PATH)?;

        Ok(Self {
            inner: Arc::new(HttpCatalogInner {
                client: reqwest::Client::new(),
                endpoint,
                categories,
                cache,
            }),
        })
    }

    /// The products endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Drop the cached listing so the next lookup refetches.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate_all();
    }

    #[instrument(skip(self), fields(endpoint = %self.inner.endpoint))]
    async fn fetch(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        if let Some(products) = self.inner.cache.get(&()).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let response = self
            .inner
            .client
            .get(self.inner.endpoint.clone())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Product API returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        let products: Vec<Product> = match serde_json::from_str(&body) {
            Ok(products) => products,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse product listing"
                );
                return Err(CatalogError::Parse(e));
            }
        };

        debug!(count = products.len(), "Fetched product listing");
        let products = Arc::new(products);
        self.inner.cache.insert((), Arc::clone(&products)).await;
        Ok(products)
    }
}

impl Catalog for HttpCatalog {
    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.fetch().await?.as_ref().clone())
    }

    async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.inner.categories.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;

    #[test]
    fn test_endpoint_joins_base_path() {
        let base = Url::parse("https://shop.example.com").unwrap();
        let catalog = HttpCatalog::new(&base, Vec::new()).unwrap();
        assert_eq!(
            catalog.endpoint().as_str(),
            "https://shop.example.com/api/products"
        );

        let base = Url::parse("https://example.com/furnish").unwrap();
        let catalog = HttpCatalog::new(&base, Vec::new()).unwrap();
        assert_eq!(
            catalog.endpoint().as_str(),
            "https://example.com/furnish/api/products"
        );
    }

    #[tokio::test]
    async fn test_categories_served_without_request() {
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let categories = StaticCatalog::seed_categories().unwrap();
        let catalog = HttpCatalog::new(&base, categories.clone()).unwrap();
        assert_eq!(catalog.categories().await.unwrap(), categories);
    }

    #[tokio::test]
    async fn test_unreachable_api_is_http_error() {
        // Port 9 (discard) is not expected to serve HTTP
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let catalog = HttpCatalog::new(&base, Vec::new()).unwrap();
        assert!(matches!(catalog.list().await, Err(CatalogError::Http(_))));
    }
}
