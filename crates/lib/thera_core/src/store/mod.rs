//! Durable user store.
//!
//! The `users` table is the source of truth for profiles and for each user's
//! assistant thread id. Lookups return `Ok(None)` when no row matches; errors
//! are reserved for infrastructure failures and constraint violations.

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::user::{NewUser, ProfileUpdate, ProviderFlag, User, UserWithPassword};

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Db(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return StoreError::Duplicate(db.message().to_string());
        }
        StoreError::Db(e)
    }
}

/// User persistence capability.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Case-insensitive email lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, StoreError>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserWithPassword>, StoreError>;

    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Apply a partial update. `Ok(None)` when the user does not exist.
    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;

    /// Record the user's current thread id. Returns whether a row was updated.
    async fn set_thread(&self, id: Uuid, thread: &str) -> Result<bool, StoreError>;

    /// Mark the account as linked to a federated provider.
    async fn set_provider_flag(&self, id: Uuid, flag: ProviderFlag) -> Result<bool, StoreError>;
}
