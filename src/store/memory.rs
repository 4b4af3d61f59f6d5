//! In-process [`KeyValueStore`].
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **TTL**: every entry carries a deadline; expired entries are invisible
//!   to all operations; [`MemoryStore::purge_expired`] reclaims them
//! - **Cheap clones**: clones share the same underlying map

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{KeyValueStore, StoreResult};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| {
            StoreError::Unavailable(format!("ttl out of range: {:?}", ttl))
        })?;

        self.entries
            .write()
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let removed = self.entries.write().remove(key);
        Ok(removed
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryStore::new();

        store.set("a", "1".to_string(), HOUR).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));
        assert!(store.exists("a").await.unwrap());

        store.delete("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(!store.exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete("never-set").await.is_ok());
    }

    #[tokio::test]
    async fn test_ttl_expiry_hides_entry() {
        let store = MemoryStore::new();
        store
            .set("temp", "v".to_string(), Duration::from_millis(20))
            .await
            .unwrap();
        assert!(store.exists("temp").await.unwrap());

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.get("temp").await.unwrap(), None);
        assert!(!store.exists("temp").await.unwrap());
        assert_eq!(store.take("temp").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_take_returns_value_once() {
        let store = MemoryStore::new();
        store.set("k", "v".to_string(), HOUR).await.unwrap();

        assert_eq!(store.take("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.take("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_ttl() {
        let store = MemoryStore::new();
        store
            .set("k", "short".to_string(), Duration::from_millis(20))
            .await
            .unwrap();
        store.set("k", "long".to_string(), HOUR).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.get("k").await.unwrap(), Some("long".to_string()));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        store
            .set("gone", "x".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        store.set("kept", "y".to_string(), HOUR).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_set_leaves_other_expired_entries_to_purge() {
        let store = MemoryStore::new();
        store
            .set("stale", "x".to_string(), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        store.set("fresh", "y".to_string(), HOUR).await.unwrap();

        assert_eq!(store.get("stale").await.unwrap(), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge_expired(), 1);
    }

    #[tokio::test]
    async fn test_clone_shares_data() {
        let store = MemoryStore::new();
        let clone = store.clone();

        store.set("shared", "v".to_string(), HOUR).await.unwrap();
        assert!(clone.exists("shared").await.unwrap());
    }
}
