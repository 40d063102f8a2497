//! Cache-backed sessions.
//!
//! A session is a pair of cache entries, `access/<token>` and
//! `refresh/<token>`, each holding a JSON snapshot of the user and expiring
//! with its token. There is no revocation list.

use std::fmt;

use tracing::debug;

use super::AuthError;
use super::tokens::{Scope, TokenPair, issue_token_pair, validate_secret};
use crate::cache::{CacheError, SessionCache, get_json, keys, set_json};
use crate::models::user::User;

/// Per-scope secret material mixed into issued tokens.
#[derive(Clone)]
pub struct TokenSecrets {
    pub access: String,
    pub refresh: String,
}

impl TokenSecrets {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// Reject secrets too short to produce full-length tokens.
    pub fn validate(&self) -> Result<(), AuthError> {
        validate_secret(Scope::Access, &self.access)?;
        validate_secret(Scope::Refresh, &self.refresh)
    }
}

impl fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecrets { .. }")
    }
}

/// Mint a token pair for `user` and cache the user snapshot under both tokens.
pub async fn issue_session(
    cache: &dyn SessionCache,
    user: &User,
    secrets: &TokenSecrets,
) -> Result<TokenPair, AuthError> {
    let pair = issue_token_pair(user.id, &secrets.access, &secrets.refresh)?;

    set_json(
        cache,
        &keys::access(&pair.access.plaintext),
        user,
        Scope::Access.ttl(),
    )
    .await?;
    set_json(
        cache,
        &keys::refresh(&pair.refresh.plaintext),
        user,
        Scope::Refresh.ttl(),
    )
    .await?;

    debug!(user_id = %user.id, "session issued");
    Ok(pair)
}

/// Resolve the user snapshot stored under an access token.
pub async fn lookup_access(
    cache: &dyn SessionCache,
    token: &str,
) -> Result<Option<User>, CacheError> {
    get_json(cache, &keys::access(token)).await
}

/// Resolve the user snapshot stored under a refresh token.
pub async fn lookup_refresh(
    cache: &dyn SessionCache,
    token: &str,
) -> Result<Option<User>, CacheError> {
    get_json(cache, &keys::refresh(token)).await
}

/// Replace the snapshot held under an access token, restarting its TTL.
pub async fn store_access_snapshot(
    cache: &dyn SessionCache,
    token: &str,
    user: &User,
) -> Result<(), CacheError> {
    set_json(cache, &keys::access(token), user, Scope::Access.ttl()).await
}
