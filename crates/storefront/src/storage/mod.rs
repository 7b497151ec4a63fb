//! Durable key → JSON storage backends.
//!
//! The [`Bridge`](crate::bridge::Bridge) persists cart and wishlist
//! collections through a [`Storage`] implementation. Backends only move JSON
//! blobs; they know nothing about carts or identities.
//!
//! # Backends
//!
//! - [`MemoryStorage`] - process-local map (tests, ephemeral sessions)
//! - [`FileStorage`] - one JSON file per key in a state directory
//! - [`PgStorage`] - `storefront.client_state` table in `PostgreSQL`

use std::future::Future;

use furnish_flow_core::StorageKey;
use serde_json::Value;
use thiserror::Error;

pub mod file;
pub mod memory;
pub mod postgres;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use postgres::PgStorage;

/// Errors returned by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored blob is not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A durable key → JSON blob store.
///
/// Writes are last-write-wins; there is no transactional guarantee beyond
/// that. All methods take `&self` so implementations can be shared.
pub trait Storage: Send + Sync + 'static {
    /// Read the blob stored under `key`, or `None` if nothing is stored.
    fn get(
        &self,
        key: &StorageKey,
    ) -> impl Future<Output = Result<Option<Value>, StorageError>> + Send;

    /// Replace the blob stored under `key`.
    fn set(
        &self,
        key: &StorageKey,
        value: &Value,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete the blob stored under `key`. Deleting a missing key succeeds.
    fn remove(&self, key: &StorageKey) -> impl Future<Output = Result<(), StorageError>> + Send;
}
