//! Session cache whose backend is always down, for tests of outage handling.

use std::time::Duration;

use async_trait::async_trait;

use super::{CacheError, SessionCache};

/// Every call fails with [`CacheError::Backend`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSessionCache;

fn outage() -> CacheError {
    CacheError::Backend("connection refused".into())
}

#[async_trait]
impl SessionCache for UnavailableSessionCache {
    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(outage())
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(outage())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(outage())
    }
}
