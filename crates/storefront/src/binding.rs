//! Identity binding shared by the cart and wishlist containers.
//!
//! Rebinding is two steps so a reload can be abandoned:
//!
//! 1. `begin_rebind(identity)` swaps the storage key, empties the collection,
//!    and hands out a [`LoadTicket`] stamped with a fresh generation.
//! 2. `finish_rebind(ticket, items)` installs the loaded items only if the
//!    ticket is still the newest one. Results for an older identity are
//!    discarded.

use furnish_flow_core::{CollectionKind, Identity, StorageKey};
use serde::de::DeserializeOwned;

use crate::bridge::Bridge;
use crate::error::StateError;

/// Permission to install one reload's result into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct LoadTicket {
    generation: u64,
    kind: CollectionKind,
    identity: Identity,
    key: Option<StorageKey>,
}

impl LoadTicket {
    /// Identity this reload is for.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Storage key to load from, or `None` when nothing is persisted.
    #[must_use]
    pub const fn key(&self) -> Option<&StorageKey> {
        self.key.as_ref()
    }

    /// Read this ticket's collection through `bridge`. Failures load as empty.
    pub async fn fetch<T: DeserializeOwned>(&self, bridge: &Bridge) -> Vec<T> {
        match &self.key {
            Some(key) => bridge.load_or_empty(key).await,
            None => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Binding {
    kind: CollectionKind,
    identity: Identity,
    key: Option<StorageKey>,
    generation: u64,
    pending: Option<u64>,
}

impl Binding {
    pub(crate) fn new(kind: CollectionKind) -> Self {
        let identity = Identity::Anonymous;
        Self {
            kind,
            key: StorageKey::for_collection(kind, &identity),
            identity,
            generation: 0,
            pending: None,
        }
    }

    pub(crate) fn begin(&mut self, identity: Identity) -> LoadTicket {
        self.generation += 1;
        self.key = StorageKey::for_collection(self.kind, &identity);
        self.identity = identity;
        self.pending = Some(self.generation);

        LoadTicket {
            generation: self.generation,
            kind: self.kind,
            identity: self.identity.clone(),
            key: self.key.clone(),
        }
    }

    /// Consume `ticket`; `true` if its result should be installed.
    pub(crate) fn accept(&mut self, ticket: &LoadTicket) -> bool {
        if ticket.kind == self.kind && self.pending == Some(ticket.generation) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub(crate) const fn ensure_ready(&self) -> Result<(), StateError> {
        if self.pending.is_some() {
            Err(StateError::RebindPending)
        } else {
            Ok(())
        }
    }

    pub(crate) const fn identity(&self) -> &Identity {
        &self.identity
    }

    pub(crate) const fn key(&self) -> Option<&StorageKey> {
        self.key.as_ref()
    }

    pub(crate) const fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}
