//! In-process assistant for tests.
//!
//! Threads live in a `DashMap`; each posted message is answered with
//! `"echo: <text>"`. Threads can be forgotten to simulate provider-side
//! expiry, and failures can be injected per call.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use super::{Assistant, AssistantError};
use crate::models::chat::Message;

#[derive(Debug, Default)]
pub struct ScriptedAssistant {
    threads: DashMap<String, Vec<Message>>,
    next_id: AtomicUsize,
    created: AtomicUsize,
    posts: AtomicUsize,
    fail_create: AtomicBool,
    not_found_posts: AtomicUsize,
    post_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every post for `delay` before answering.
    pub fn with_post_delay(delay: Duration) -> Self {
        Self {
            post_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Number of threads created so far.
    pub fn threads_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of `post_message_and_run` calls so far, failed ones included.
    pub fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    /// Highest number of posts observed running at the same time.
    pub fn max_concurrent_posts(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn has_thread(&self, thread_id: &str) -> bool {
        self.threads.contains_key(thread_id)
    }

    /// Drop a thread so later calls report it as not found.
    pub fn forget_thread(&self, thread_id: &str) {
        self.threads.remove(thread_id);
    }

    /// Make `create_thread` fail until reset.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make the next `n` posts fail with `ThreadNotFound` regardless of thread.
    pub fn fail_next_posts_not_found(&self, n: usize) {
        self.not_found_posts.store(n, Ordering::SeqCst);
    }

    fn take_injected_not_found(&self) -> bool {
        self.not_found_posts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Assistant for ScriptedAssistant {
    async fn create_thread(&self) -> Result<String, AssistantError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AssistantError::Api {
                status: 500,
                message: "thread creation disabled".into(),
            });
        }
        let id = format!("thread_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.threads.insert(id.clone(), Vec::new());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn post_message_and_run(
        &self,
        thread_id: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AssistantError> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        if self.take_injected_not_found() || !self.threads.contains_key(thread_id) {
            return Err(AssistantError::ThreadNotFound(thread_id.to_string()));
        }

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let waited = match self.post_delay {
            Some(delay) => tokio::select! {
                _ = cancel.cancelled() => Err(AssistantError::Cancelled),
                _ = tokio::time::sleep(delay) => Ok(()),
            },
            None => Ok(()),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        waited?;

        let reply = format!("echo: {text}");
        let mut thread = self
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| AssistantError::ThreadNotFound(thread_id.to_string()))?;
        thread.push(Message {
            role: "user".into(),
            text: text.to_string(),
        });
        thread.push(Message {
            role: "assistant".into(),
            text: reply.clone(),
        });
        Ok(reply)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>, AssistantError> {
        let thread = self
            .threads
            .get(thread_id)
            .ok_or_else(|| AssistantError::ThreadNotFound(thread_id.to_string()))?;
        Ok(thread.iter().rev().cloned().collect())
    }
}
