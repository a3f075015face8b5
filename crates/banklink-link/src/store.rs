//! In-memory per-user session store.
//!
//! Backed by [`DashMap`] so lookups from concurrent requests never contend
//! on a global lock. Each session sits behind its own async mutex: a host
//! that lets one user issue concurrent requests must hold that lock for the
//! duration of a coordinator operation, so a token exchange and a reset
//! cannot interleave.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::session::LinkSession;

/// Shared handle to one user's session.
pub type SessionHandle = Arc<Mutex<LinkSession>>;

/// Concurrent map from user key to [`LinkSession`].
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone, Default)]
pub struct LinkSessionStore {
    inner: Arc<DashMap<String, SessionHandle>>,
}

impl LinkSessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `key`, created empty if it does not exist.
    pub fn session(&self, key: &str) -> SessionHandle {
        Arc::clone(self.inner.entry(key.to_string()).or_default().value())
    }

    /// The session for `key`, if one exists. Never inserts.
    pub fn get(&self, key: &str) -> Option<SessionHandle> {
        self.inner.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// A copy of the session for `key`, if one exists.
    pub async fn snapshot(&self, key: &str) -> Option<LinkSession> {
        let handle = self.get(key)?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Drop the session for `key`. Returns whether one existed.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.remove(key).is_some()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LinkState;

    #[tokio::test]
    async fn session_is_created_on_first_access() {
        let store = LinkSessionStore::new();
        assert!(store.is_empty());
        assert!(store.snapshot("u1").await.is_none());

        let handle = store.session("u1");
        assert_eq!(handle.lock().await.state(), LinkState::Unlinked);
        assert_eq!(store.len(), 1);
        assert!(store.snapshot("u1").await.is_some());
    }

    #[tokio::test]
    async fn same_key_shares_one_session() {
        let store = LinkSessionStore::new();
        let a = store.session("u1");
        let b = store.session("u1");
        assert!(Arc::ptr_eq(&a, &b));

        let other = store.session("u2");
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn remove_drops_session() {
        let store = LinkSessionStore::new();
        store.session("u1");
        assert!(store.remove("u1"));
        assert!(!store.remove("u1"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn get_does_not_insert() {
        let store = LinkSessionStore::new();
        assert!(store.get("u1").is_none());
        assert!(store.is_empty());

        let created = store.session("u1");
        let found = store.get("u1").unwrap();
        assert!(Arc::ptr_eq(&created, &found));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LinkSessionStore>();
    }
}
