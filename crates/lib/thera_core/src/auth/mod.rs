//! Authentication logic.
//!
//! Provides opaque bearer-token issuance, password hashing, token secret
//! resolution and cache-backed sessions shared by `thera_api` handlers and
//! middleware.

pub mod password;
pub mod secrets;
pub mod session;
pub mod tokens;

use thiserror::Error;

use crate::cache::CacheError;
use crate::store::StoreError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Random source unavailable: {0}")]
    Entropy(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
