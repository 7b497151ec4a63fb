//! In-memory catalog.

use std::sync::Arc;

use furnish_flow_core::{Category, Product, ProductId};
use serde::Deserialize;

use super::{Catalog, CatalogError};

const SEED: &str = include_str!("../../data/catalog.json");

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    categories: Vec<Category>,
    products: Vec<Product>,
}

/// Products and categories held in memory.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    products: Arc<[Product]>,
    categories: Arc<[Category]>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new(products: Vec<Product>, categories: Vec<Category>) -> Self {
        Self {
            products: products.into(),
            categories: categories.into(),
        }
    }

    /// Parse `{"categories": [...], "products": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` if the document does not match.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::new(file.products, file.categories))
    }

    /// The bundled demo catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` if the bundled data is malformed.
    pub fn seed() -> Result<Self, CatalogError> {
        Self::from_json(SEED)
    }

    /// Seed categories, for sources whose API has no category listing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` if the bundled data is malformed.
    pub fn seed_categories() -> Result<Vec<Category>, CatalogError> {
        Ok(Self::seed()?.categories.to_vec())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Catalog for StaticCatalog {
    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.to_vec())
    }

    async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.categories.to_vec())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.iter().find(|p| p.id == id).cloned())
    }
}
