//! Integration tests for Furnish Flow.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p furnish-flow-integration-tests
//! ```
//!
//! The suites drive whole shopper sessions against real storage backends
//! (JSON files in a scratch directory) through the public storefront API.

use std::path::{Path, PathBuf};

use furnish_flow_core::UserKey;
use furnish_flow_storefront::bridge::Bridge;
use furnish_flow_storefront::identity::IdentityObserver;
use furnish_flow_storefront::session::ShopSession;
use furnish_flow_storefront::storage::FileStorage;
use uuid::Uuid;

/// A scratch state directory removed on drop.
#[derive(Debug)]
pub struct TempStateDir {
    path: PathBuf,
}

impl TempStateDir {
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: std::env::temp_dir().join(format!("furnish-flow-it-{}", Uuid::new_v4())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh bridge over file storage in this directory.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn bridge(&self) -> Bridge {
        Bridge::spawn(FileStorage::new(&self.path))
    }

    /// Number of collection files written so far.
    #[must_use]
    pub fn file_count(&self) -> usize {
        std::fs::read_dir(&self.path).map_or(0, |entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                .count()
        })
    }
}

impl Default for TempStateDir {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempStateDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Parse a user key, panicking on invalid test input.
///
/// # Panics
///
/// Panics if `name` is not a valid user key.
#[must_use]
pub fn user(name: &str) -> UserKey {
    match UserKey::parse(name) {
        Ok(key) => key,
        Err(e) => panic!("invalid test user {name:?}: {e}"),
    }
}

/// Open a session against `bridge` for the observer's current identity.
pub async fn open(bridge: &Bridge, identity: &IdentityObserver) -> ShopSession {
    ShopSession::open(bridge.clone(), identity.subscribe()).await
}
