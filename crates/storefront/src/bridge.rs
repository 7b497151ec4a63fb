//! Persistent key-value bridge between in-memory collections and storage.
//!
//! # Architecture
//!
//! A [`Bridge`] is a cheap, cloneable handle to one background worker task
//! that owns the [`Storage`] backend. Loads, saves, and flushes travel through
//! a single ordered queue, so:
//!
//! - saves are fire-and-forget: [`Bridge::save`] enqueues and returns
//! - a load observes every save queued before it
//! - last write wins
//!
//! A failed save is logged, reported to Sentry, and remembered per key until
//! a later save of the same key succeeds. Because every save carries the
//! whole collection, the next mutation is the retry.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use furnish_flow_core::StorageKey;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::error::StateError;
use crate::storage::{Storage, StorageError};

enum Command {
    Load {
        key: StorageKey,
        reply: oneshot::Sender<Result<Option<Value>, StorageError>>,
    },
    Save {
        key: StorageKey,
        value: Value,
    },
    Remove {
        key: StorageKey,
    },
    Flush {
        reply: oneshot::Sender<Vec<StorageKey>>,
    },
}

/// Handle to the persistence worker.
#[derive(Debug, Clone)]
pub struct Bridge {
    tx: mpsc::UnboundedSender<Command>,
    failing: Arc<AtomicUsize>,
}

impl Bridge {
    /// Start a worker that owns `storage` and return a handle to it.
    ///
    /// Must be called from within a Tokio runtime. The worker stops once
    /// every handle has been dropped and the queue is drained.
    #[must_use]
    pub fn spawn<S: Storage>(storage: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let failing = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run_worker(storage, rx, Arc::clone(&failing)));
        Self { tx, failing }
    }

    /// Load the collection stored under `key`.
    ///
    /// A missing key is an empty collection. Elements that no longer decode
    /// (e.g. a zero quantity) are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `StateError::PersistenceUnavailable` if the worker is gone,
    /// the backend fails, or the stored blob is not a JSON array.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn load<T: DeserializeOwned>(&self, key: &StorageKey) -> Result<Vec<T>, StateError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Load {
                key: key.clone(),
                reply,
            })
            .map_err(|_| worker_gone())?;

        let stored = rx
            .await
            .map_err(|_| worker_gone())?
            .map_err(|e| StateError::PersistenceUnavailable(e.to_string()))?;

        decode_collection(key, stored)
    }

    /// Load the collection under `key`, treating any failure as empty.
    pub async fn load_or_empty<T: DeserializeOwned>(&self, key: &StorageKey) -> Vec<T> {
        match self.load(key).await {
            Ok(items) => items,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to load collection, starting empty");
                Vec::new()
            }
        }
    }

    /// Queue a write of the whole collection under `key`.
    ///
    /// Returns as soon as the write is queued. An empty collection removes
    /// the key.
    ///
    /// # Errors
    ///
    /// Returns `StateError::PersistenceUnavailable` if the collection cannot
    /// be serialized or the worker is gone. Backend failures are not
    /// reported here; see [`Bridge::flush`].
    pub fn save<T: Serialize>(&self, key: &StorageKey, items: &[T]) -> Result<(), StateError> {
        let command = if items.is_empty() {
            Command::Remove { key: key.clone() }
        } else {
            let value = serde_json::to_value(items)
                .map_err(|e| StateError::PersistenceUnavailable(e.to_string()))?;
            Command::Save {
                key: key.clone(),
                value,
            }
        };
        self.tx.send(command).map_err(|_| worker_gone())
    }

    /// Wait until every queued operation has been applied.
    ///
    /// # Errors
    ///
    /// Returns `StateError::PersistenceUnavailable` naming the keys whose most
    /// recent write failed, or if the worker is gone.
    pub async fn flush(&self) -> Result<(), StateError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Flush { reply })
            .map_err(|_| worker_gone())?;
        let failed = rx.await.map_err(|_| worker_gone())?;

        if failed.is_empty() {
            Ok(())
        } else {
            let keys: Vec<&str> = failed.iter().map(StorageKey::as_str).collect();
            Err(StateError::PersistenceUnavailable(format!(
                "unsaved changes for {}",
                keys.join(", ")
            )))
        }
    }

    /// Whether any key's most recent write failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.failing.load(Ordering::SeqCst) > 0
    }
}

fn worker_gone() -> StateError {
    StateError::PersistenceUnavailable("persistence worker stopped".to_string())
}

/// Turn a stored blob into a collection, skipping elements that fail to
/// decode.
fn decode_collection<T: DeserializeOwned>(
    key: &StorageKey,
    stored: Option<Value>,
) -> Result<Vec<T>, StateError> {
    let elements = match stored {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(elements)) => elements,
        Some(other) => {
            return Err(StateError::PersistenceUnavailable(format!(
                "stored value for {key} is not a list (found {})",
                json_kind(&other)
            )));
        }
    };

    let total = elements.len();
    let items: Vec<T> = elements
        .into_iter()
        .filter_map(|element| match serde_json::from_value(element) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping unreadable stored item");
                None
            }
        })
        .collect();

    if items.len() < total {
        debug!(key = %key, kept = items.len(), total, "Dropped invalid stored items");
    }
    Ok(items)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

async fn run_worker<S: Storage>(
    storage: S,
    mut rx: mpsc::UnboundedReceiver<Command>,
    failing: Arc<AtomicUsize>,
) {
    let mut failed: BTreeSet<StorageKey> = BTreeSet::new();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Load { key, reply } => {
                let _ = reply.send(storage.get(&key).await);
            }
            Command::Save { key, value } => {
                let result = storage.set(&key, &value).await;
                record_write(&mut failed, key, result);
            }
            Command::Remove { key } => {
                let result = storage.remove(&key).await;
                record_write(&mut failed, key, result);
            }
            Command::Flush { reply } => {
                let _ = reply.send(failed.iter().cloned().collect());
            }
        }
        failing.store(failed.len(), Ordering::SeqCst);
    }

    debug!("Persistence worker stopped");
}

fn record_write(
    failed: &mut BTreeSet<StorageKey>,
    key: StorageKey,
    result: Result<(), StorageError>,
) {
    match result {
        Ok(()) => {
            if failed.remove(&key) {
                info!(key = %key, "Persistence recovered");
            }
        }
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            warn!(
                key = %key,
                error = %e,
                sentry_event_id = %event_id,
                "Failed to persist collection, keeping in-memory state"
            );
            failed.insert(key);
        }
    }
}
