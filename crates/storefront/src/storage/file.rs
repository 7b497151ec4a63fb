//! JSON-file storage backend.
//!
//! Each key is stored as `<state_dir>/<base64url(key)>.json`. Encoding the key
//! keeps arbitrary user ids out of path syntax and makes distinct keys map to
//! distinct files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use furnish_flow_core::StorageKey;
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{Storage, StorageError};

/// Storage backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` as the state directory. It is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The state directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.dir
            .join(format!("{}.json", URL_SAFE_NO_PAD.encode(key.as_str())))
    }
}

impl Storage for FileStorage {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &StorageKey) -> Result<Option<Value>, StorageError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, value), fields(key = %key))]
    async fn set(&self, key: &StorageKey, value: &Value) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        let bytes = serde_json::to_vec(value)?;

        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(bytes = bytes.len(), "Wrote state file");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use furnish_flow_core::{CollectionKind, Identity, UserKey};
    use serde_json::json;

    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("furnish-flow-test-{}", Uuid::new_v4()))
    }

    fn key(kind: CollectionKind, user: &str) -> StorageKey {
        let identity = Identity::from(UserKey::parse(user).unwrap());
        StorageKey::for_collection(kind, &identity).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_reads_as_none() {
        let storage = FileStorage::new(temp_dir());
        assert!(
            storage
                .get(&key(CollectionKind::Cart, "u1"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_roundtrip_and_remove() {
        let dir = temp_dir();
        let storage = FileStorage::new(&dir);
        let k = key(CollectionKind::Cart, "u1/../../etc");

        storage.set(&k, &json!([{"id": 1}])).await.unwrap();
        assert_eq!(storage.get(&k).await.unwrap(), Some(json!([{"id": 1}])));

        // Only the state file, no leftover temp files, nothing outside the dir
        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names.len(), 1);
        assert!(names.iter().all(|n| n.ends_with(".json")));

        storage.remove(&k).await.unwrap();
        assert!(storage.get(&k).await.unwrap().is_none());
        storage.remove(&k).await.unwrap();

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_do_not_collide() {
        let dir = temp_dir();
        let storage = FileStorage::new(&dir);
        let cart = key(CollectionKind::Cart, "u1");
        let wishlist = key(CollectionKind::Wishlist, "u1");

        storage.set(&cart, &json!(["cart"])).await.unwrap();
        storage.set(&wishlist, &json!(["wishlist"])).await.unwrap();

        assert_eq!(storage.get(&cart).await.unwrap(), Some(json!(["cart"])));
        assert_eq!(
            storage.get(&wishlist).await.unwrap(),
            Some(json!(["wishlist"]))
        );

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = temp_dir();
        let storage = FileStorage::new(&dir);
        let k = key(CollectionKind::Cart, "u1");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(storage.path_for(&k), b"{not json")
            .await
            .unwrap();

        assert!(matches!(
            storage.get(&k).await,
            Err(StorageError::Serialization(_))
        ));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
