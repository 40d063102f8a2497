//! In-memory user store for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::models::user::{
    DEFAULT_ROLE, NewUser, ProfileUpdate, ProviderFlag, User, UserWithPassword,
};

/// [`UserStore`] backed by a `DashMap`, with a counter of thread writes.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, UserWithPassword>,
    thread_writes: AtomicUsize,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set_thread` calls so far.
    pub fn thread_writes(&self) -> usize {
        self.thread_writes.load(Ordering::SeqCst)
    }

    /// Remove a user, simulating a deleted account.
    pub fn remove(&self, id: Uuid) {
        self.users.remove(&id);
    }

    fn find_where(&self, pred: impl Fn(&User) -> bool) -> Option<UserWithPassword> {
        self.users
            .iter()
            .find(|entry| pred(&entry.value().user))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|entry| entry.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, StoreError> {
        if email.is_empty() {
            return Ok(None);
        }
        Ok(self.find_where(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserWithPassword>, StoreError> {
        if phone.is_empty() {
            return Ok(None);
        }
        Ok(self.find_where(|u| u.phone == phone))
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        if !new.email.is_empty() && self.find_by_email(&new.email).await?.is_some() {
            return Err(StoreError::Duplicate("users_email_key".into()));
        }
        if !new.phone.is_empty() && self.find_by_phone(&new.phone).await?.is_some() {
            return Err(StoreError::Duplicate("users_phone_key".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            phone: new.phone,
            email: new.email,
            name: new.name,
            surname: new.surname,
            roles: DEFAULT_ROLE.to_string(),
            is_google: new.is_google,
            is_apple: new.is_apple,
            thread: new.thread,
            created_at: Utc::now(),
        };
        self.users.insert(
            user.id,
            UserWithPassword {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let Some(mut entry) = self.users.get_mut(&id) else {
            return Ok(None);
        };
        let user = &mut entry.user;
        if let Some(phone) = &update.phone {
            user.phone = phone.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(surname) = &update.surname {
            user.surname = surname.clone();
        }
        Ok(Some(user.clone()))
    }

    async fn set_thread(&self, id: Uuid, thread: &str) -> Result<bool, StoreError> {
        self.thread_writes.fetch_add(1, Ordering::SeqCst);
        match self.users.get_mut(&id) {
            Some(mut entry) => {
                entry.user.thread = thread.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_provider_flag(&self, id: Uuid, flag: ProviderFlag) -> Result<bool, StoreError> {
        match self.users.get_mut(&id) {
            Some(mut entry) => {
                match flag {
                    ProviderFlag::Google => entry.user.is_google = true,
                    ProviderFlag::Apple => entry.user.is_apple = true,
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
