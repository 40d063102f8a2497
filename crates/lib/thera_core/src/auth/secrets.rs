//! Token secret resolution.
//!
//! Each token scope mixes its own secret into the token material. Secrets are
//! resolved from an environment variable, then from a file persisted under
//! the platform data directory, and are generated and persisted on first run.

use std::path::{Path, PathBuf};

use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};

use super::tokens::Scope;

/// Length of a generated secret.
const GENERATED_SECRET_LEN: usize = 64;

/// Environment variable consulted for a scope's secret.
pub fn env_var(scope: Scope) -> &'static str {
    match scope {
        Scope::Access => "SECRET_KEY_ACCESS",
        Scope::Refresh => "SECRET_KEY_REFRESH",
    }
}

/// Resolve a scope secret: env var → persisted file → generated & persisted.
pub fn resolve_token_secret(scope: Scope) -> String {
    if let Ok(secret) = std::env::var(env_var(scope))
        && !secret.is_empty()
    {
        return secret;
    }
    resolve_persisted_secret(&secret_path(scope))
}

/// Read the secret at `path`, generating and writing one when absent.
pub fn resolve_persisted_secret(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(path = %parent.display(), error = %e, "could not create secret directory");
    }
    match std::fs::write(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new token secret"),
        Err(e) => warn!(path = %path.display(), error = %e, "token secret not persisted"),
    }
    secret
}

/// Path to the persisted secret file for a scope.
fn secret_path(scope: Scope) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("thera")
        .join(format!("{scope}-secret"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("thera-secret-test-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn generates_then_reuses_persisted_secret() {
        let path = scratch_path("access-secret");
        let first = resolve_persisted_secret(&path);
        assert_eq!(first.len(), GENERATED_SECRET_LEN);
        let second = resolve_persisted_secret(&path);
        assert_eq!(first, second);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn env_vars_are_per_scope() {
        assert_ne!(env_var(Scope::Access), env_var(Scope::Refresh));
    }
}
