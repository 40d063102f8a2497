//! Redis-backed session cache.
//!
//! Uses a `bb8` pool of multiplexed connections. Values are written with
//! `SET key value EX ttl`; a nil reply from `GET` is the miss path.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection, RunError};
use bb8_redis::redis::{self, RedisError};
use tracing::debug;

use super::{CacheError, SessionCache};

impl From<RedisError> for CacheError {
    fn from(e: RedisError) -> Self {
        CacheError::Backend(format!("redis: {e}"))
    }
}

impl From<RunError<RedisError>> for CacheError {
    fn from(e: RunError<RedisError>) -> Self {
        CacheError::Backend(format!("redis pool: {e}"))
    }
}

/// Redis [`SessionCache`].
#[derive(Clone)]
pub struct RedisSessionCache {
    pool: Pool<RedisConnectionManager>,
}

impl RedisSessionCache {
    /// Build the pool and verify the server answers `PING`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, CacheError> {
        let manager = RedisConnectionManager::new(url)?;
        let pool = Pool::builder()
            .max_size(max_connections)
            .build(manager)
            .await?;
        let cache = Self { pool };
        cache.ping().await?;
        Ok(cache)
    }

    /// Round-trip a `PING` to the server.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let reply: String = redis::cmd("PING").query_async(&mut *conn).await?;
        debug!(reply = %reply, "redis ping");
        Ok(())
    }

    async fn conn(&self) -> Result<PooledConnection<'_, RedisConnectionManager>, CacheError> {
        Ok(self.pool.get().await?)
    }
}

/// Redis rejects `EX 0`; sub-second TTLs round up to one second.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async(&mut *conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut *conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_rounds_up_to_one_second() {
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
        assert_eq!(ttl_seconds(Duration::from_millis(400)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(86_400)), 86_400);
    }
}
