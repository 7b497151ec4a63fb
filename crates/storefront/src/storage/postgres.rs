//! `PostgreSQL` storage backend.
//!
//! # Table: `storefront.client_state`
//!
//! | column       | type          |
//! |--------------|---------------|
//! | `key`        | `TEXT` (PK)   |
//! | `value`      | `JSONB`       |
//! | `updated_at` | `TIMESTAMPTZ` |
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p furnish-flow-cli -- migrate
//! ```

use std::time::Duration;

use furnish_flow_core::StorageKey;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use super::{Storage, StorageError};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the storefront schema migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Storage backed by the `storefront.client_state` table.
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using [`create_pool`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the connection fails.
    pub async fn connect(database_url: &SecretString) -> Result<Self, StorageError> {
        Ok(Self::new(create_pool(database_url).await?))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Storage for PgStorage {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &StorageKey) -> Result<Option<Value>, StorageError> {
        let value = sqlx::query_scalar::<_, Value>(
            r"
            SELECT value FROM storefront.client_state
            WHERE key = $1
            ",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    #[instrument(skip(self, value), fields(key = %key))]
    async fn set(&self, key: &StorageKey, value: &Value) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO storefront.client_state (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            ",
        )
        .bind(key.as_str())
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
        sqlx::query(
            r"
            DELETE FROM storefront.client_state
            WHERE key = $1
            ",
        )
        .bind(key.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
