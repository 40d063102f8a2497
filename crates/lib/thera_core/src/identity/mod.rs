//! Federated identity verification.
//!
//! A client signs in with an external provider and presents the resulting
//! credential; an [`IdentityProvider`] checks it and reports who the caller
//! is. Account linking happens in the API service layer.

pub mod firebase;
#[cfg(any(test, feature = "test-support"))]
pub mod fixed;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::user::ProviderFlag;

pub use firebase::FirebaseIdentity;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The credential was rejected or names no account.
    #[error("invalid identity credential: {0}")]
    InvalidCredential(String),

    #[error("identity provider request failed: {0}")]
    Provider(String),

    #[error("identity provider configuration error: {0}")]
    Config(String),
}

/// Identity asserted by a provider after verifying a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub provider_user_id: String,
    pub email: String,
    /// The provider has confirmed the caller controls `email`.
    pub email_verified: bool,
    pub name: String,
    /// Upstream sign-in provider, e.g. `google.com`.
    pub provider: String,
}

impl VerifiedIdentity {
    /// The user flag this sign-in provider sets, if any.
    pub fn provider_flag(&self) -> Option<ProviderFlag> {
        match self.provider.as_str() {
            "google.com" => Some(ProviderFlag::Google),
            "apple.com" => Some(ProviderFlag::Apple),
            _ => None,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError>;
}
