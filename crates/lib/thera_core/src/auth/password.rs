//! Password hashing via bcrypt.

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Check a login attempt against a stored hash.
///
/// Accounts without a local password (federated-only) never match. Any
/// mismatch is reported as the generic [`AuthError::CredentialError`].
pub fn check_password(password: &str, hash: Option<&str>) -> Result<(), AuthError> {
    let Some(hash) = hash.filter(|h| !h.is_empty()) else {
        return Err(AuthError::CredentialError);
    };
    let matches = bcrypt::verify(password, hash)
        .map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))?;
    if matches {
        Ok(())
    } else {
        Err(AuthError::CredentialError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_check() {
        let hash = hash_password("hunter22").unwrap();
        assert!(check_password("hunter22", Some(&hash)).is_ok());
        assert!(matches!(
            check_password("wrong", Some(&hash)),
            Err(AuthError::CredentialError)
        ));
    }

    #[test]
    fn missing_hash_never_matches() {
        assert!(matches!(
            check_password("anything", None),
            Err(AuthError::CredentialError)
        ));
        assert!(matches!(
            check_password("anything", Some("")),
            Err(AuthError::CredentialError)
        ));
    }
}
