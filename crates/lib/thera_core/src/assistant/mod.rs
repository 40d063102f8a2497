//! Conversational assistant provider.
//!
//! The provider owns conversation state: a thread holds the message history
//! and a run produces the assistant's reply. This crate needs three
//! operations from it:
//!
//! - [`Assistant::create_thread`]: open an empty thread
//! - [`Assistant::post_message_and_run`]: append a user message, start a
//!   run, poll it to a terminal status and return the reply text
//! - [`Assistant::list_messages`]: read the thread, newest first
//!
//! # Providers
//!
//! - [`openai::OpenAiAssistant`]: OpenAI Assistants API (v2)
//! - `scripted::ScriptedAssistant`: in-process fake (tests only)

pub mod openai;
pub mod poll;
#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::chat::Message;

pub use openai::{OpenAiAssistant, OpenAiConfig};
pub use poll::PollPolicy;

/// Reply returned when a run stops in `requires_action`. Tool calls are not
/// supported, so the run is left as is and this placeholder is returned.
pub const REQUIRES_ACTION_REPLY: &str = "required action";

/// Errors that can occur while talking to the assistant provider.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// The provider no longer knows the thread. Callers recover by creating
    /// a fresh thread.
    #[error("No thread found with id '{0}'")]
    ThreadNotFound(String),

    #[error("run failed: {message}, code: {code}")]
    RunFailed { code: String, message: String },

    #[error("run {0}")]
    RunTerminated(RunStatus),

    #[error("run did not finish within {0:?}")]
    Timeout(Duration),

    #[error("run polling cancelled")]
    Cancelled,

    #[error("no response")]
    EmptyReply,

    #[error("assistant API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("assistant request failed: {0}")]
    Transport(String),

    #[error("assistant configuration error: {0}")]
    Config(String),
}

impl AssistantError {
    pub fn is_thread_not_found(&self) -> bool {
        matches!(self, AssistantError::ThreadNotFound(_))
    }
}

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assistant provider capability.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Create an empty thread and return its id.
    async fn create_thread(&self) -> Result<String, AssistantError>;

    /// Post `text` as a user message, run the assistant and wait for the reply.
    ///
    /// Waiting stops early with [`AssistantError::Cancelled`] once `cancel`
    /// fires.
    async fn post_message_and_run(
        &self,
        thread_id: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AssistantError>;

    /// Messages of a thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>, AssistantError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_parses_provider_strings() {
        let status: RunStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, RunStatus::InProgress);
        let status: RunStatus = serde_json::from_str("\"requires_action\"").unwrap();
        assert_eq!(status, RunStatus::RequiresAction);
        let status: RunStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(status, RunStatus::Unknown);
    }

    #[test]
    fn terminated_error_names_status() {
        let err = AssistantError::RunTerminated(RunStatus::Expired);
        assert_eq!(err.to_string(), "run expired");
    }
}
