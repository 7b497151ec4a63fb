//! In-process storage backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use furnish_flow_core::StorageKey;
use serde_json::Value;

use super::{Storage, StorageError};

/// Process-local storage.
///
/// Clones share the same map, so a test can keep a handle after giving one to
/// the bridge. Reads can be slowed down and reads or writes made to fail to
/// exercise the degraded paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: Mutex<HashMap<StorageKey, Value>>,
    read_delay: Mutex<Duration>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value directly, bypassing failure injection.
    pub fn insert(&self, key: StorageKey, value: Value) {
        self.entries().insert(key, value);
    }

    /// Current value under `key`.
    #[must_use]
    pub fn snapshot(&self, key: &StorageKey) -> Option<Value> {
        self.entries().get(key).cloned()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Delay every subsequent read by `delay`.
    pub fn set_read_delay(&self, delay: Duration) {
        *self
            .inner
            .read_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Make reads fail until reset.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make writes fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<StorageKey, Value>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_delay(&self) -> Duration {
        *self
            .inner
            .read_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    async fn get(&self, key: &StorageKey) -> Result<Option<Value>, StorageError> {
        let delay = self.read_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("read of {key} refused")));
        }
        Ok(self.snapshot(key))
    }

    async fn set(&self, key: &StorageKey, value: &Value) -> Result<(), StorageError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("write of {key} refused")));
        }
        self.entries().insert(key.clone(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("delete of {key} refused")));
        }
        self.entries().remove(key);
        Ok(())
    }
}
