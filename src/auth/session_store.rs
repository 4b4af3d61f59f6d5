/// Refresh Session Storage
///
/// Persists [`RefreshSession`] records in a [`KeyValueStore`] under
/// `session:<hash>`, where `<hash>` is the SHA-256 of the refresh secret.
/// The plaintext secret never reaches the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::store::{KeyValueStore, StoreResult};

/// Namespace for refresh session keys
pub const SESSION_PREFIX: &str = "session:";

/// A stored refresh session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshSession {
    /// Owning user identifier
    pub user_id: String,
    /// Absolute expiry
    pub expiry: DateTime<Utc>,
}

impl RefreshSession {
    pub fn is_expired(&self) -> bool {
        self.expiry <= Utc::now()
    }
}

/// Hash a refresh secret using SHA-256
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Store key for a hashed secret
pub fn session_key(hash: &str) -> String {
    format!("{}{}", SESSION_PREFIX, hash)
}

/// Typed CRUD over refresh sessions
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, hash: &str, session: &RefreshSession, ttl: Duration) -> StoreResult<()> {
        let data = serde_json::to_string(session)
            .map_err(|e| StoreError::Corrupt(format!("failed to marshal session: {}", e)))?;
        self.store.set(&session_key(hash), data, ttl).await
    }

    pub async fn load(&self, hash: &str) -> StoreResult<Option<RefreshSession>> {
        let raw = self.store.get(&session_key(hash)).await?;
        raw.map(|data| decode(&data)).transpose()
    }

    /// Load and delete in one atomic step.
    pub async fn take(&self, hash: &str) -> StoreResult<Option<RefreshSession>> {
        let raw = self.store.take(&session_key(hash)).await?;
        raw.map(|data| decode(&data)).transpose()
    }

    pub async fn remove(&self, hash: &str) -> StoreResult<()> {
        self.store.delete(&session_key(hash)).await
    }

    pub async fn contains(&self, hash: &str) -> StoreResult<bool> {
        self.store.exists(&session_key(hash)).await
    }
}

fn decode(data: &str) -> StoreResult<RefreshSession> {
    serde_json::from_str(data)
        .map_err(|e| StoreError::Corrupt(format!("failed to unmarshal session: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const HOUR: Duration = Duration::from_secs(3600);

    fn session() -> RefreshSession {
        RefreshSession {
            user_id: "user-1".to_string(),
            expiry: Utc::now() + chrono::Duration::days(30),
        }
    }

    #[test]
    fn test_token_hashing() {
        let hash1 = hash_token("secret");
        let hash2 = hash_token("secret");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, "secret");
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, hash_token("secret2"));
    }

    #[test]
    fn test_session_key_is_namespaced() {
        assert_eq!(session_key("abc"), "session:abc");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let backend = MemoryStore::new();
        let sessions = SessionStore::new(Arc::new(backend.clone()));
        let record = session();

        sessions.save("h1", &record, HOUR).await.unwrap();

        assert_eq!(sessions.load("h1").await.unwrap(), Some(record));
        assert!(sessions.contains("h1").await.unwrap());
        assert!(backend.get("session:h1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_take_removes_record() {
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
        sessions.save("h1", &session(), HOUR).await.unwrap();

        assert!(sessions.take("h1").await.unwrap().is_some());
        assert!(sessions.take("h1").await.unwrap().is_none());
        assert!(!sessions.contains("h1").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_absent_is_ok() {
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
        assert!(sessions.remove("missing").await.is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_record() {
        let backend = MemoryStore::new();
        backend
            .set("session:bad", "{not json".to_string(), HOUR)
            .await
            .unwrap();
        let sessions = SessionStore::new(Arc::new(backend));

        assert!(matches!(
            sessions.load("bad").await,
            Err(StoreError::Corrupt(_))
        ));
    }
}
