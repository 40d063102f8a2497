//! Opaque bearer-token issuance.
//!
//! A token is 16 bytes from the OS random source followed by the scope's
//! secret, base-32 encoded without padding and cut to 32 characters. The
//! plaintext is the cache key; its SHA-512 digest is carried on the record
//! but not used for lookup.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use data_encoding::BASE32_NOPAD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha512};
use uuid::Uuid;

use super::AuthError;

/// Access token lifetime: 24 hours.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Length of a token plaintext in characters.
pub const TOKEN_LEN: usize = 32;

/// Random bytes drawn per token.
const RANDOM_BYTES: usize = 16;

/// Minimum secret length so that the encoding reaches [`TOKEN_LEN`] characters.
/// 20 bytes encode to exactly 32 base-32 characters.
pub const MIN_SECRET_LEN: usize = TOKEN_LEN * 5 / 8 - RANDOM_BYTES;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Access,
    Refresh,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Access => "access",
            Scope::Refresh => "refresh",
        }
    }

    /// Validity window for tokens of this scope.
    pub fn ttl(&self) -> Duration {
        match self {
            Scope::Access => ACCESS_TOKEN_TTL,
            Scope::Refresh => REFRESH_TOKEN_TTL,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issued credential.
#[derive(Clone)]
pub struct Token {
    /// Value returned to the caller and used as the cache key.
    pub plaintext: String,
    /// SHA-512 of `plaintext`.
    pub hash: Vec<u8>,
    pub user_id: Uuid,
    pub expiry: DateTime<Utc>,
    pub scope: Scope,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("user_id", &self.user_id)
            .field("expiry", &self.expiry)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// An access/refresh pair minted together.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: Token,
    pub refresh: Token,
}

/// Check that a scope secret is long enough to produce a full-length token.
pub fn validate_secret(scope: Scope, secret: &str) -> Result<(), AuthError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(AuthError::ValidationError(format!(
            "{scope} token secret must be at least {MIN_SECRET_LEN} bytes"
        )));
    }
    Ok(())
}

/// SHA-512 digest of a token plaintext.
pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha512::digest(plaintext.as_bytes()).to_vec()
}

fn generate_token(user_id: Uuid, scope: Scope, secret: &str) -> Result<Token, AuthError> {
    validate_secret(scope, secret)?;

    let mut material = vec![0u8; RANDOM_BYTES];
    OsRng
        .try_fill_bytes(&mut material)
        .map_err(|e| AuthError::Entropy(e.to_string()))?;
    material.extend_from_slice(secret.as_bytes());

    let mut plaintext = BASE32_NOPAD.encode(&material);
    plaintext.truncate(TOKEN_LEN);

    let ttl = chrono::Duration::from_std(scope.ttl())
        .map_err(|e| AuthError::Internal(format!("token ttl: {e}")))?;

    Ok(Token {
        hash: hash_token(&plaintext),
        plaintext,
        user_id,
        expiry: Utc::now() + ttl,
        scope,
    })
}

/// Mint an access token (24h) and a refresh token (7d) for `user_id`.
///
/// Each token is generated independently. A random-source failure is
/// returned to the caller without retry.
pub fn issue_token_pair(
    user_id: Uuid,
    access_secret: &str,
    refresh_secret: &str,
) -> Result<TokenPair, AuthError> {
    let access = generate_token(user_id, Scope::Access, access_secret)?;
    let refresh = generate_token(user_id, Scope::Refresh, refresh_secret)?;
    Ok(TokenPair { access, refresh })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_SECRET: &str = "access-secret-for-tests";
    const REFRESH_SECRET: &str = "refresh-secret-for-tests";

    fn is_base32(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c))
    }

    #[test]
    fn min_secret_len_is_four_bytes() {
        assert_eq!(MIN_SECRET_LEN, 4);
    }

    #[test]
    fn pair_has_distinct_fixed_length_base32_tokens() {
        let user = Uuid::new_v4();
        let pair = issue_token_pair(user, ACCESS_SECRET, REFRESH_SECRET).unwrap();

        assert_eq!(pair.access.plaintext.len(), TOKEN_LEN);
        assert_eq!(pair.refresh.plaintext.len(), TOKEN_LEN);
        assert!(is_base32(&pair.access.plaintext), "{}", pair.access.plaintext);
        assert!(is_base32(&pair.refresh.plaintext), "{}", pair.refresh.plaintext);
        assert_ne!(pair.access.plaintext, pair.refresh.plaintext);

        assert_eq!(pair.access.user_id, user);
        assert_eq!(pair.access.scope, Scope::Access);
        assert_eq!(pair.refresh.scope, Scope::Refresh);
    }

    #[test]
    fn expiries_follow_scope_policy() {
        let before = Utc::now();
        let pair = issue_token_pair(Uuid::new_v4(), ACCESS_SECRET, REFRESH_SECRET).unwrap();
        let after = Utc::now();

        let day = chrono::Duration::hours(24);
        let week = chrono::Duration::days(7);
        assert!(pair.access.expiry >= before + day && pair.access.expiry <= after + day);
        assert!(pair.refresh.expiry >= before + week && pair.refresh.expiry <= after + week);
    }

    #[test]
    fn tokens_are_not_derived_from_user_id() {
        let user = Uuid::new_v4();
        let a = issue_token_pair(user, ACCESS_SECRET, REFRESH_SECRET).unwrap();
        let b = issue_token_pair(user, ACCESS_SECRET, REFRESH_SECRET).unwrap();
        assert_ne!(a.access.plaintext, b.access.plaintext);
        assert_ne!(a.refresh.plaintext, b.refresh.plaintext);
    }

    #[test]
    fn hash_is_sha512_of_plaintext() {
        let pair = issue_token_pair(Uuid::new_v4(), ACCESS_SECRET, REFRESH_SECRET).unwrap();
        assert_eq!(pair.access.hash.len(), 64);
        assert_eq!(pair.access.hash, hash_token(&pair.access.plaintext));
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = issue_token_pair(Uuid::new_v4(), "abc", REFRESH_SECRET).unwrap_err();
        assert!(matches!(err, AuthError::ValidationError(_)));
        assert!(validate_secret(Scope::Refresh, "abcd").is_ok());
    }

    #[test]
    fn debug_does_not_print_plaintext() {
        let pair = issue_token_pair(Uuid::new_v4(), ACCESS_SECRET, REFRESH_SECRET).unwrap();
        let printed = format!("{:?}", pair.access);
        assert!(!printed.contains(&pair.access.plaintext));
    }
}
