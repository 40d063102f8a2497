//! Session cache: key/value storage with expiry.
//!
//! Holds issued tokens (`access/<token>`, `refresh/<token>` → user snapshot)
//! and thread associations (`thread/<principalId>` → thread id). Values are
//! JSON documents. A missing or expired key reads as `Ok(None)`; only
//! infrastructure failures are errors.

pub mod memory;
pub mod redis;
#[cfg(any(test, feature = "test-support"))]
pub mod unavailable;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use memory::MemorySessionCache;
pub use redis::RedisSessionCache;

/// Lifetime of a `thread/<id>` association in the cache: 24 hours.
pub const THREAD_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache errors. Absence is not an error.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache value serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal cache capability consumed by the session and thread layers.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Read the value under `key`. `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Serialize `value` as JSON and store it.
pub async fn set_json<T>(
    cache: &dyn SessionCache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), CacheError>
where
    T: Serialize + ?Sized,
{
    let encoded = serde_json::to_string(value)?;
    cache.set(key, encoded, ttl).await
}

/// Read a JSON value and deserialize it.
pub async fn get_json<T>(cache: &dyn SessionCache, key: &str) -> Result<Option<T>, CacheError>
where
    T: DeserializeOwned,
{
    match cache.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Cache key layout. Kept byte-compatible with existing deployments.
pub mod keys {
    use uuid::Uuid;

    pub const ACCESS_PREFIX: &str = "access/";
    pub const REFRESH_PREFIX: &str = "refresh/";
    pub const THREAD_PREFIX: &str = "thread/";

    pub fn access(token: &str) -> String {
        format!("{ACCESS_PREFIX}{token}")
    }

    pub fn refresh(token: &str) -> String {
        format!("{REFRESH_PREFIX}{token}")
    }

    pub fn thread(principal_id: Uuid) -> String {
        format!("{THREAD_PREFIX}{principal_id}")
    }
}
