//! Key-value store with per-key TTL.
//!
//! [`KeyValueStore`] is the narrow interface the session layer talks to.
//! Implementations must be safe for concurrent use by many in-flight
//! requests; the session layer never adds locking of its own.
//!
//! Two implementations:
//!
//! - [`RedisStore`]: sessions live in Redis and survive restarts
//! - [`MemoryStore`]: in-process map for tests and single-instance runs

mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Abstract key-value store used for refresh sessions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    /// Retrieves a value by key.
    ///
    /// Returns `Ok(None)` when the key was never set, was deleted, or has
    /// expired. Callers cannot tell these apart.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Deletes a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Atomically reads and deletes a key (`GETDEL`).
    ///
    /// Of any number of concurrent `take` calls for the same key, at most
    /// one observes the value.
    async fn take(&self, key: &str) -> StoreResult<Option<String>>;
}

