//! Application state shared by every session.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::bridge::Bridge;
use crate::catalog::{CatalogError, CatalogSource, HttpCatalog, StaticCatalog};
use crate::config::{StorageBackend, StorefrontConfig};
use crate::identity::IdentityObserver;
use crate::session::ShopSession;
use crate::storage::{FileStorage, MemoryStorage, PgStorage, StorageError};
use crate::visualizer::RoomVisualizer;

/// Error wiring up the application from configuration.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("storage backend: {0}")]
    Storage(#[from] StorageError),
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("the postgres backend needs a database URL")]
    MissingDatabaseUrl,
}

/// Application state shared across sessions.
///
/// This struct is cheaply cloneable via `Arc` and owns the persistence
/// bridge, the identity observer, and the external clients.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    config: StorefrontConfig,
    bridge: Bridge,
    identity: IdentityObserver,
    catalog: CatalogSource,
    visualizer: Option<RoomVisualizer>,
}

impl AppState {
    /// Connect the configured storage backend and build the clients.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `StartupError` if the database cannot be reached or the
    /// catalog cannot be set up.
    pub async fn new(config: StorefrontConfig) -> Result<Self, StartupError> {
        let bridge = match config.storage {
            StorageBackend::File => Bridge::spawn(FileStorage::new(config.state_dir.clone())),
            StorageBackend::Memory => Bridge::spawn(MemoryStorage::new()),
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .as_ref()
                    .ok_or(StartupError::MissingDatabaseUrl)?;
                Bridge::spawn(PgStorage::connect(url).await?)
            }
        };

        let catalog = match &config.catalog_url {
            Some(base) => {
                CatalogSource::Http(HttpCatalog::new(base, StaticCatalog::seed_categories()?)?)
            }
            None => CatalogSource::Static(StaticCatalog::seed()?),
        };

        let visualizer = config
            .visualizer
            .as_ref()
            .map(|v| RoomVisualizer::new(v.endpoint.clone(), v.api_key.clone()));

        info!(
            storage = ?config.storage,
            remote_catalog = config.catalog_url.is_some(),
            visualizer = visualizer.is_some(),
            "Application state ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                bridge,
                identity: IdentityObserver::default(),
                catalog,
                visualizer,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn bridge(&self) -> &Bridge {
        &self.inner.bridge
    }

    /// The identity source for every session opened from this state.
    #[must_use]
    pub fn identity(&self) -> &IdentityObserver {
        &self.inner.identity
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogSource {
        &self.inner.catalog
    }

    /// The room visualizer, if configured.
    #[must_use]
    pub fn visualizer(&self) -> Option<&RoomVisualizer> {
        self.inner.visualizer.as_ref()
    }

    /// Open a session bound to the current identity.
    pub async fn open_session(&self) -> ShopSession {
        ShopSession::open(self.inner.bridge.clone(), self.inner.identity.subscribe()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use furnish_flow_core::{ProductId, UserKey};

    use super::*;
    use crate::catalog::Catalog;

    fn memory_config() -> StorefrontConfig {
        StorefrontConfig::from_lookup(|key| {
            (key == "FURNISH_STORAGE_BACKEND").then(|| "memory".to_string())
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_memory_state_with_seed_catalog() {
        let state = AppState::new(memory_config()).await.unwrap();
        assert!(state.visualizer().is_none());
        assert!(matches!(state.catalog(), CatalogSource::Static(_)));
        assert!(
            state
                .catalog()
                .find_by_id(ProductId::new(2))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_sessions_share_storage() {
        let state = AppState::new(memory_config()).await.unwrap();
        state.identity().sign_in(UserKey::parse("shopper").unwrap());

        let mut first = state.open_session().await;
        first
            .add_to_cart(state.catalog(), ProductId::new(3), 2)
            .await
            .unwrap();

        let second = state.open_session().await;
        assert_eq!(second.cart().total_item_count(), 2);
    }

    #[tokio::test]
    async fn test_postgres_without_url_fails() {
        let mut config = memory_config();
        config.storage = StorageBackend::Postgres;
        assert!(matches!(
            AppState::new(config).await,
            Err(StartupError::MissingDatabaseUrl)
        ));
    }
}
