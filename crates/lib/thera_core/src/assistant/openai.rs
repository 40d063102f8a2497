//! OpenAI Assistants API (v2) client.
//!
//! One assistant, configured by id, answers every thread. A message is
//! posted, a run is started against the assistant and polled with
//! [`wait_for_run`] until it settles; the newest message in the thread is
//! the reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::poll::{PollPolicy, RunOutcome, RunSnapshot, wait_for_run};
use super::{Assistant, AssistantError, REQUIRES_ACTION_REPLY, RunStatus};
use crate::models::chat::Message;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");
const THREAD_NOT_FOUND_PREFIX: &str = "No thread found with id";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`OpenAiAssistant`].
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub assistant_id: String,
    /// Overrides the assistant's own model for each run.
    pub model: Option<String>,
    pub base_url: String,
    pub poll: PollPolicy,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[redacted]")
            .field("assistant_id", &self.assistant_id)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("poll", &self.poll)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRun<'a> {
    assistant_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
    #[serde(default)]
    last_error: Option<RunLastError>,
}

#[derive(Deserialize)]
struct RunLastError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Deserialize)]
struct MessageObject {
    role: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<TextContent>,
}

#[derive(Deserialize)]
struct TextContent {
    value: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl MessageObject {
    /// Text parts joined by newlines, `None` when the message carries no text.
    fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|part| part.text.as_ref().map(|t| t.value.as_str()))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

/// Map a non-success response to an error. A 404 whose message names a
/// missing thread becomes [`AssistantError::ThreadNotFound`].
fn classify_error(status: StatusCode, body: &str, thread_id: Option<&str>) -> AssistantError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| body.to_string());

    if status == StatusCode::NOT_FOUND && message.starts_with(THREAD_NOT_FOUND_PREFIX) {
        return AssistantError::ThreadNotFound(thread_id.unwrap_or_default().to_string());
    }
    AssistantError::Api {
        status: status.as_u16(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`Assistant`] backed by the OpenAI Assistants API.
#[derive(Debug, Clone)]
pub struct OpenAiAssistant {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiAssistant {
    pub fn new(config: OpenAiConfig) -> Result<Self, AssistantError> {
        if config.api_key.is_empty() {
            return Err(AssistantError::Config("OPENAI_API_KEY is required".into()));
        }
        if config.assistant_id.is_empty() {
            return Err(AssistantError::Config("OPENAI_ASSISTANT_ID is required".into()));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Build the client and check that the configured assistant exists.
    pub async fn connect(config: OpenAiConfig) -> Result<Self, AssistantError> {
        let assistant = Self::new(config)?;
        assistant.verify().await?;
        Ok(assistant)
    }

    /// Fetch the configured assistant; fails when it does not exist.
    pub async fn verify(&self) -> Result<(), AssistantError> {
        let path = format!("/assistants/{}", self.config.assistant_id);
        let found: IdObject = self.send(self.request(Method::GET, &path), None).await?;
        info!(assistant_id = %found.id, "Assistant verified");
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        self.client
            .request(method, url)
            .bearer_auth(&self.config.api_key)
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        thread_id: Option<&str>,
    ) -> Result<T, AssistantError> {
        let resp = request
            .send()
            .await
            .map_err(|e| AssistantError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_error(status, &body, thread_id));
        }
        resp.json::<T>()
            .await
            .map_err(|e| AssistantError::Transport(format!("response parse error: {e}")))
    }

    async fn fetch_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, AssistantError> {
        let path = format!("/threads/{thread_id}/runs/{run_id}");
        let run: RunObject = self
            .send(self.request(Method::GET, &path), Some(thread_id))
            .await?;
        Ok(RunSnapshot {
            status: run.status,
            last_error: run.last_error.map(|e| (e.code, e.message)),
        })
    }

    async fn fetch_messages(&self, thread_id: &str) -> Result<MessageList, AssistantError> {
        let path = format!("/threads/{thread_id}/messages");
        self.send(
            self.request(Method::GET, &path).query(&[("order", "desc")]),
            Some(thread_id),
        )
        .await
    }
}

#[async_trait]
impl Assistant for OpenAiAssistant {
    async fn create_thread(&self) -> Result<String, AssistantError> {
        let thread: IdObject = self
            .send(
                self.request(Method::POST, "/threads").json(&serde_json::json!({})),
                None,
            )
            .await?;
        debug!(thread_id = %thread.id, "Created assistant thread");
        Ok(thread.id)
    }

    async fn post_message_and_run(
        &self,
        thread_id: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AssistantError> {
        let path = format!("/threads/{thread_id}/messages");
        let _: IdObject = self
            .send(
                self.request(Method::POST, &path).json(&CreateMessage {
                    role: "user",
                    content: text,
                }),
                Some(thread_id),
            )
            .await?;

        let path = format!("/threads/{thread_id}/runs");
        let run: RunObject = self
            .send(
                self.request(Method::POST, &path).json(&CreateRun {
                    assistant_id: &self.config.assistant_id,
                    model: self.config.model.as_deref(),
                }),
                Some(thread_id),
            )
            .await?;
        let run_id = run.id.as_str();
        debug!(thread_id, run_id, "Started run");

        let outcome = wait_for_run(
            || self.fetch_run(thread_id, run_id),
            self.config.poll,
            cancel,
        )
        .await?;

        if outcome == RunOutcome::RequiresAction {
            return Ok(REQUIRES_ACTION_REPLY.to_string());
        }

        let list = self.fetch_messages(thread_id).await?;
        list.data
            .first()
            .and_then(MessageObject::text)
            .ok_or(AssistantError::EmptyReply)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>, AssistantError> {
        let list = self.fetch_messages(thread_id).await?;
        Ok(list
            .data
            .into_iter()
            .filter_map(|m| {
                let text = m.text()?;
                Some(Message { role: m.role, text })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_thread_is_classified() {
        let body = r#"{"error":{"message":"No thread found with id 'thread_abc'.","type":"invalid_request_error"}}"#;
        let err = classify_error(StatusCode::NOT_FOUND, body, Some("thread_abc"));
        assert!(matches!(err, AssistantError::ThreadNotFound(ref id) if id == "thread_abc"));
    }

    #[test]
    fn other_not_found_is_api_error() {
        let body = r#"{"error":{"message":"No assistant found with id 'asst_x'."}}"#;
        let err = classify_error(StatusCode::NOT_FOUND, body, None);
        assert!(matches!(err, AssistantError::Api { status: 404, .. }));
    }

    #[test]
    fn unparseable_body_is_kept_verbatim() {
        let err = classify_error(StatusCode::BAD_GATEWAY, "upstream down", Some("t"));
        match err {
            AssistantError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn message_text_joins_text_parts_and_skips_others() {
        let json = r#"{
            "role": "assistant",
            "content": [
                {"type": "text", "text": {"value": "Hello", "annotations": []}},
                {"type": "image_file", "image_file": {"file_id": "f"}},
                {"type": "text", "text": {"value": "there", "annotations": []}}
            ]
        }"#;
        let msg: MessageObject = serde_json::from_str(json).unwrap();
        assert_eq!(msg.text().as_deref(), Some("Hello\nthere"));

        let empty: MessageObject =
            serde_json::from_str(r#"{"role":"assistant","content":[]}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn run_object_parses_failure_detail() {
        let json = r#"{
            "id": "run_1",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "boom"}
        }"#;
        let run: RunObject = serde_json::from_str(json).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        let err = run.last_error.unwrap();
        assert_eq!(err.code, "server_error");
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn create_run_omits_model_when_unset() {
        let body = serde_json::to_value(CreateRun {
            assistant_id: "asst_1",
            model: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"assistant_id": "asst_1"}));
    }

    #[test]
    fn new_rejects_missing_credentials() {
        let config = OpenAiConfig {
            api_key: String::new(),
            assistant_id: "asst_1".into(),
            model: None,
            base_url: DEFAULT_BASE_URL.into(),
            poll: PollPolicy::default(),
        };
        assert!(matches!(
            OpenAiAssistant::new(config),
            Err(AssistantError::Config(_))
        ));
    }

    #[test]
    fn config_debug_redacts_key() {
        let config = OpenAiConfig {
            api_key: "sk-secret".into(),
            assistant_id: "asst_1".into(),
            model: Some("gpt-4o".into()),
            base_url: DEFAULT_BASE_URL.into(),
            poll: PollPolicy::default(),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("asst_1"));
    }
}
