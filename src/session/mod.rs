//! Sessions and the authentication flow
//!
//! A [`Session`] is the request-scoped identity derived from a verified
//! bearer token. The [`SessionManager`] owns token issuance and the
//! authenticator invocation flow.

mod manager;

pub use manager::{AuthFlowError, AuthOutcome, SessionManager};

use crate::store::UserStore;
use crate::ResourceRef;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Errors surfaced by [`Session::load_user`]. Clone because the result
/// of the one permitted store round-trip is memoized for the session's
/// lifetime, failures included.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("user {0} no longer exists")]
    UserNotFound(ResourceRef),

    #[error("user store error: {0}")]
    Store(String),
}

/// A verified session: the user's resource reference, the token expiry,
/// and a deferred handle to the full user document.
pub struct Session {
    id: ResourceRef,
    valid_until: i64,
    store: Arc<dyn UserStore>,
    user: OnceCell<Result<Value, SessionError>>,
}

impl Session {
    pub fn new(id: ResourceRef, valid_until: i64, store: Arc<dyn UserStore>) -> Self {
        Self {
            id,
            valid_until,
            store,
            user: OnceCell::new(),
        }
    }

    /// The resource reference carried by the token
    pub fn id(&self) -> &ResourceRef {
        &self.id
    }

    /// Token expiry, epoch seconds
    pub fn valid_until(&self) -> i64 {
        self.valid_until
    }

    /// Load the full user document, lazily and at most once.
    ///
    /// The first call performs the store round-trip; every later call
    /// returns the memoized outcome, so one request always sees one
    /// stable user snapshot. A missing user is a recoverable per-call
    /// error, not a fault.
    pub async fn load_user(&self) -> Result<Value, SessionError> {
        self.user
            .get_or_init(|| async {
                match self.store.find(&self.id.type_, &self.id.id).await {
                    Ok(Some(document)) => Ok(document),
                    Ok(None) => Err(SessionError::UserNotFound(self.id.clone())),
                    Err(err) => Err(SessionError::Store(err.to_string())),
                }
            })
            .await
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_load_user_returns_document() {
        let store = Arc::new(MemoryStore::new());
        store.seed("test-users", "quint", json!({"email": "quint@example.com"}));

        let session = Session::new(
            ResourceRef::new("test-users", "quint"),
            Utc::now().timestamp() + 30,
            store,
        );
        let user = session.load_user().await.unwrap();
        assert_eq!(user["data"]["attributes"]["email"], "quint@example.com");
    }

    #[tokio::test]
    async fn test_missing_user_is_recoverable() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(
            ResourceRef::new("test-users", "ghost"),
            Utc::now().timestamp() + 30,
            store,
        );
        assert!(matches!(
            session.load_user().await,
            Err(SessionError::UserNotFound(_))
        ));
    }

    /// Store that counts round-trips, to pin the memoization contract
    struct CountingStore {
        inner: MemoryStore,
        finds: AtomicUsize,
    }

    #[async_trait]
    impl UserStore for CountingStore {
        async fn find(&self, type_: &str, id: &str) -> Result<Option<Value>, StoreError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            self.inner.find(type_, id).await
        }
        async fn create(&self, type_: &str, document: &Value) -> Result<Value, StoreError> {
            self.inner.create(type_, document).await
        }
        async fn update(&self, type_: &str, id: &str, document: &Value) -> Result<Value, StoreError> {
            self.inner.update(type_, id, document).await
        }
    }

    #[tokio::test]
    async fn test_load_user_memoizes_success_and_failure() {
        let store = Arc::new(CountingStore {
            inner: MemoryStore::new(),
            finds: AtomicUsize::new(0),
        });
        store.inner.seed("test-users", "quint", json!({}));

        let session = Session::new(
            ResourceRef::new("test-users", "quint"),
            Utc::now().timestamp() + 30,
            store.clone(),
        );
        session.load_user().await.unwrap();
        session.load_user().await.unwrap();
        assert_eq!(store.finds.load(Ordering::SeqCst), 1);

        let missing = Session::new(
            ResourceRef::new("test-users", "ghost"),
            Utc::now().timestamp() + 30,
            store.clone(),
        );
        assert!(missing.load_user().await.is_err());
        assert!(missing.load_user().await.is_err());
        assert_eq!(store.finds.load(Ordering::SeqCst), 2);
    }
}
