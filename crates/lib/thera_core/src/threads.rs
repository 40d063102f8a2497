//! Binding principals to assistant threads.
//!
//! Each user or anonymous session talks to the assistant through one remote
//! thread. [`ThreadBinder`] finds that thread (cache first, then the user
//! record), creates one when none exists, and replaces it when the provider
//! reports it gone.
//!
//! For users the `thread` column is authoritative and `thread/<id>` in the
//! session cache is a rebuildable copy. Anonymous sessions only have the cache
//! entry and lose their thread when it expires.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assistant::{Assistant, AssistantError};
use crate::cache::{self, CacheError, SessionCache, THREAD_TTL, keys};
use crate::models::chat::{Message, Principal};
use crate::store::{StoreError, UserStore};

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("user {0} not found")]
    UserNotFound(Uuid),

    /// The id names a registered user, not an anonymous session.
    #[error("{0} is not an anonymous session")]
    InvalidAnonymousSession(Uuid),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Assistant(#[from] AssistantError),
}

/// Resolves, creates and recovers the assistant thread of a principal.
pub struct ThreadBinder {
    cache: Arc<dyn SessionCache>,
    store: Arc<dyn UserStore>,
    assistant: Arc<dyn Assistant>,
    /// One lock per principal with a message in flight.
    locks: DashMap<Principal, Arc<Mutex<()>>>,
}

impl ThreadBinder {
    pub fn new(
        cache: Arc<dyn SessionCache>,
        store: Arc<dyn UserStore>,
        assistant: Arc<dyn Assistant>,
    ) -> Self {
        Self {
            cache,
            store,
            assistant,
            locks: DashMap::new(),
        }
    }

    /// Return the principal's thread, creating one if it has none.
    pub async fn resolve_thread(&self, principal: Principal) -> Result<String, ThreadError> {
        self.check_anonymous(principal).await?;
        let key = keys::thread(principal.id());
        if let Some(thread) = cache::get_json::<String>(self.cache.as_ref(), &key).await? {
            return Ok(thread);
        }

        if let Principal::User(user_id) = principal {
            let user = self
                .store
                .get_by_id(user_id)
                .await?
                .ok_or(ThreadError::UserNotFound(user_id))?;
            if user.has_thread() {
                debug!(%principal, thread_id = %user.thread, "Backfilling thread cache");
                cache::set_json(self.cache.as_ref(), &key, &user.thread, THREAD_TTL).await?;
                return Ok(user.thread);
            }
        }

        self.bind_new_thread(principal).await
    }

    /// Replace a thread the provider no longer knows.
    pub async fn recover_from_stale_thread(
        &self,
        principal: Principal,
    ) -> Result<String, ThreadError> {
        warn!(%principal, "Assistant thread is gone, creating a new one");
        self.bind_new_thread(principal).await
    }

    /// Start a fresh conversation, discarding the current thread binding.
    pub async fn start_new_thread(&self, principal: Principal) -> Result<String, ThreadError> {
        self.check_anonymous(principal).await?;
        self.bind_new_thread(principal).await
    }

    /// Open an anonymous session: a new session id bound to a new thread.
    pub async fn start_anonymous_session(&self) -> Result<(Uuid, String), ThreadError> {
        let session_id = Uuid::new_v4();
        let thread = self.bind_new_thread(Principal::Anonymous(session_id)).await?;
        Ok((session_id, thread))
    }

    /// Post `text` to the principal's thread and return the reply.
    ///
    /// Submissions for the same principal run one at a time. A thread the
    /// provider reports as missing is replaced and the message retried once.
    pub async fn send_message(
        &self,
        principal: Principal,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ThreadError> {
        let lease = self.lease(principal);
        let _guard = lease.lock.lock().await;
        self.send_locked(principal, text, cancel).await
    }

    /// The principal's conversation, oldest message first.
    pub async fn list_messages(&self, principal: Principal) -> Result<Vec<Message>, ThreadError> {
        let thread = self.resolve_thread(principal).await?;
        let mut messages = self.assistant.list_messages(&thread).await?;
        messages.reverse();
        Ok(messages)
    }

    async fn send_locked(
        &self,
        principal: Principal,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ThreadError> {
        let thread = self.resolve_thread(principal).await?;
        match self.assistant.post_message_and_run(&thread, text, cancel).await {
            Err(e) if e.is_thread_not_found() => {
                let thread = self.recover_from_stale_thread(principal).await?;
                Ok(self
                    .assistant
                    .post_message_and_run(&thread, text, cancel)
                    .await?)
            }
            other => Ok(other?),
        }
    }

    /// Create a thread and bind it: user record first, then cache.
    async fn bind_new_thread(&self, principal: Principal) -> Result<String, ThreadError> {
        let thread = self.assistant.create_thread().await?;

        if let Principal::User(user_id) = principal
            && !self.store.set_thread(user_id, &thread).await?
        {
            return Err(ThreadError::UserNotFound(user_id));
        }

        let key = keys::thread(principal.id());
        cache::set_json(self.cache.as_ref(), &key, &thread, THREAD_TTL).await?;
        info!(%principal, thread_id = %thread, "Bound new assistant thread");
        Ok(thread)
    }

    /// Anonymous session ids share the `thread/<id>` keyspace with user ids
    /// and must not name a registered user.
    async fn check_anonymous(&self, principal: Principal) -> Result<(), ThreadError> {
        if let Principal::Anonymous(id) = principal
            && self.store.get_by_id(id).await?.is_some()
        {
            warn!(session_id = %id, "Anonymous request with a user id");
            return Err(ThreadError::InvalidAnonymousSession(id));
        }
        Ok(())
    }

    fn lease(&self, principal: Principal) -> LockLease<'_> {
        let lock = self.locks.entry(principal).or_default().clone();
        LockLease {
            locks: &self.locks,
            principal,
            lock,
        }
    }
}

/// A principal's lock, taken out of the lock map for one submission.
///
/// Dropping the lease, on completion or when the request future is dropped,
/// removes the map entry unless another task still holds it.
struct LockLease<'a> {
    locks: &'a DashMap<Principal, Arc<Mutex<()>>>,
    principal: Principal,
    lock: Arc<Mutex<()>>,
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        // Owned by the map and this lease only.
        self.locks
            .remove_if(&self.principal, |_, lock| Arc::strong_count(lock) == 2);
    }
}
