//! # thera_core
//!
//! Core domain logic for Thera: token issuance, the session cache, the user
//! store, the assistant and identity providers, and thread binding.

pub mod assistant;
pub mod auth;
pub mod cache;
pub mod identity;
pub mod models;
pub mod store;
pub mod threads;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
