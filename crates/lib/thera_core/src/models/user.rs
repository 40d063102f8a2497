//! User domain models.
//!
//! `User` is the shape cached as a session snapshot and returned to clients.
//! The password hash never leaves the store layer except inside
//! [`UserWithPassword`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default role assigned to new accounts.
pub const DEFAULT_ROLE: &str = "user";

/// Domain user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// Empty when the account has no phone number.
    #[serde(default)]
    pub phone: String,
    /// Empty when the account has no email address.
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default = "default_role")]
    pub roles: String,
    #[serde(default)]
    pub is_google: bool,
    #[serde(default)]
    pub is_apple: bool,
    /// External assistant thread id. Empty until one is created.
    #[serde(default)]
    pub thread: String,
    pub created_at: DateTime<Utc>,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

impl User {
    /// Whether the account already has an assistant thread recorded.
    pub fn has_thread(&self) -> bool {
        !self.thread.is_empty()
    }
}

/// User with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: Option<String>,
}

/// Fields for creating a user record.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub phone: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: String,
    pub surname: String,
    pub is_google: bool,
    pub is_apple: bool,
    pub thread: String,
}

/// Partial profile update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.email.is_none() && self.name.is_none() && self.surname.is_none()
    }
}

/// Federated identity provider flag stored on the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFlag {
    Google,
    Apple,
}
