//! In-process session cache with TTL-based expiration.
//!
//! Used when no Redis URL is configured and by tests. Entries live in a
//! `DashMap`; expired entries read as absent and are swept periodically.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{CacheError, SessionCache};

/// Interval between sweeps of expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A cached entry with expiry.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// In-memory [`SessionCache`].
#[derive(Debug, Default)]
pub struct MemorySessionCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        let now = Utc::now();
        self.entries.retain(|_, entry| entry.is_live(now));
    }

    /// Number of stored entries, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                cache.cleanup();
            }
        })
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CacheError::Backend(format!("ttl out of range: {e}")))?;
        let expires_at = Utc::now() + ttl;
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Utc::now();
        let value = self
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone());
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}
