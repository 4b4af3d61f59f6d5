//! Redis-backed [`KeyValueStore`].
//!
//! Every operation is a single Redis command, so atomicity comes from the
//! server: `SET .. PX`, `GET`, `DEL`, `EXISTS` and `GETDEL` (Redis 6.2+).
//! The connection manager reconnects on its own after a dropped link.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisError;

use super::{KeyValueStore, StoreResult};
use crate::error::StoreError;

fn unavailable(e: RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// Expiry in milliseconds; Redis refuses a zero expiry.
fn expiry_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to `url`, e.g. `redis://127.0.0.1:6379/0`.
    ///
    /// # Errors
    /// Returns `Unavailable` if the URL is invalid or the server cannot be reached
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = client.get_connection_manager().await.map_err(unavailable)?;
        Ok(Self { conn })
    }

    /// Round-trip a `PING`.
    pub async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(unavailable)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(expiry_millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(unavailable)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await
            .map(|count| count > 0)
            .map_err(unavailable)
    }

    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        redis::cmd("GETDEL")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_millis() {
        assert_eq!(expiry_millis(Duration::from_secs(30)), 30_000);
        assert_eq!(expiry_millis(Duration::ZERO), 1);
        assert_eq!(expiry_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        match RedisStore::connect("not a redis url").await {
            Err(StoreError::Unavailable(_)) => {}
            _ => panic!("expected an unavailable store"),
        }
    }

    /// Runs only when `REDIS_URL` points at a live server.
    #[tokio::test]
    async fn test_operations_against_live_server() {
        let Ok(url) = std::env::var("REDIS_URL") else {
            return;
        };
        let store = RedisStore::connect(&url).await.expect("Failed to connect to Redis");
        store.ping().await.unwrap();

        let key = format!("test:{}", uuid::Uuid::new_v4());
        store
            .set(&key, "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some("v".to_string()));
        assert!(store.exists(&key).await.unwrap());

        assert_eq!(store.take(&key).await.unwrap(), Some("v".to_string()));
        assert_eq!(store.take(&key).await.unwrap(), None);
        assert!(!store.exists(&key).await.unwrap());

        store
            .set(&key, "short".to_string(), Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.get(&key).await.unwrap(), None);

        store.delete(&key).await.unwrap();
    }
}
