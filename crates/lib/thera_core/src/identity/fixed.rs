//! Identity provider with a fixed credential table, for tests.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{IdentityError, IdentityProvider, VerifiedIdentity};

#[derive(Debug, Default)]
pub struct FixedIdentityProvider {
    identities: DashMap<String, VerifiedIdentity>,
}

impl FixedIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `credential` as proof of `identity`.
    pub fn accept(&self, credential: impl Into<String>, identity: VerifiedIdentity) {
        self.identities.insert(credential.into(), identity);
    }
}

#[async_trait]
impl IdentityProvider for FixedIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.identities
            .get(credential)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| IdentityError::InvalidCredential("unknown credential".into()))
    }
}
