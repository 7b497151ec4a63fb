//! Session identity observer.
//!
//! Stands in for the external auth provider: holds the current [`Identity`]
//! and notifies subscribers once per transition (anonymous → user,
//! user → anonymous, user A → user B). Re-setting the current identity
//! notifies nobody.
//!
//! Subscribers always see the newest identity; several quick transitions may
//! reach a slow subscriber as a single change.

use furnish_flow_core::{Identity, UserKey};
use tokio::sync::watch;
use tracing::info;

/// Source of truth for who is browsing.
#[derive(Debug)]
pub struct IdentityObserver {
    tx: watch::Sender<Identity>,
}

impl Default for IdentityObserver {
    fn default() -> Self {
        Self::new(Identity::Anonymous)
    }
}

impl IdentityObserver {
    /// Start with `initial` as the current identity.
    #[must_use]
    pub fn new(initial: Identity) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// The current identity.
    #[must_use]
    pub fn current(&self) -> Identity {
        self.tx.borrow().clone()
    }

    /// Subscribe to identity transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Identity> {
        self.tx.subscribe()
    }

    /// Switch to `identity`. Returns `true` if this was a transition.
    pub fn set(&self, identity: Identity) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == identity {
                false
            } else {
                *current = identity.clone();
                true
            }
        });
        if changed {
            info!(identity = %identity, "Identity changed");
        }
        changed
    }

    /// Sign `user` in.
    pub fn sign_in(&self, user: UserKey) -> bool {
        self.set(Identity::User(user))
    }

    /// Sign out to anonymous browsing.
    pub fn sign_out(&self) -> bool {
        self.set(Identity::Anonymous)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserKey {
        UserKey::parse(id).unwrap()
    }

    #[test]
    fn test_starts_anonymous() {
        assert_eq!(IdentityObserver::default().current(), Identity::Anonymous);
    }

    #[tokio::test]
    async fn test_fires_once_per_transition() {
        let observer = IdentityObserver::default();
        let mut rx = observer.subscribe();

        assert!(observer.sign_in(user("a")));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Identity::User(user("a")));

        // Same identity again: no transition
        assert!(!observer.sign_in(user("a")));
        assert!(!rx.has_changed().unwrap());

        assert!(observer.sign_in(user("b")));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Identity::User(user("b")));

        assert!(observer.sign_out());
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_anonymous());
        assert!(!observer.sign_out());
    }

    #[tokio::test]
    async fn test_set_without_subscribers() {
        let observer = IdentityObserver::default();
        assert!(observer.sign_in(user("a")));
        assert_eq!(observer.current(), Identity::User(user("a")));
    }

    #[tokio::test]
    async fn test_dropping_observer_closes_subscription() {
        let observer = IdentityObserver::default();
        let mut rx = observer.subscribe();
        drop(observer);
        assert!(rx.changed().await.is_err());
    }
}
