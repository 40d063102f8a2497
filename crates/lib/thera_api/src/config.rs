//! API server configuration.

use std::fmt;
use std::time::Duration;

use thera_core::assistant::openai::{DEFAULT_BASE_URL, OpenAiConfig};
use thera_core::assistant::poll::{DEFAULT_POLL_INTERVAL, DEFAULT_RUN_TIMEOUT, PollPolicy};
use thera_core::auth::secrets::resolve_token_secret;
use thera_core::auth::session::TokenSecrets;
use thera_core::auth::tokens::Scope;
use tracing::warn;

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL. `None` keeps sessions in process memory.
    pub redis_url: Option<String>,
    /// Secrets mixed into access and refresh tokens.
    pub secrets: TokenSecrets,
    pub openai_api_key: String,
    pub openai_assistant_id: String,
    /// Per-run model override.
    pub openai_model: Option<String>,
    pub openai_base_url: String,
    pub poll: PollPolicy,
    /// Web API key of the Firebase project. `None` disables federated login.
    pub firebase_api_key: Option<String>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                                  |
    /// |------------------------------|------------------------------------------|
    /// | `BIND_ADDR`                  | `0.0.0.0:8080`                           |
    /// | `DATABASE_URL`               | `postgres://localhost:5432/thera`        |
    /// | `REDIS_URL`                  | unset (in-memory sessions)               |
    /// | `SECRET_KEY_ACCESS`          | generated & persisted to file            |
    /// | `SECRET_KEY_REFRESH`         | generated & persisted to file            |
    /// | `OPENAI_API_KEY`             | empty                                    |
    /// | `OPENAI_ASSISTANT_ID`        | empty                                    |
    /// | `OPENAI_MODEL`               | unset (assistant's model)                |
    /// | `OPENAI_BASE_URL`            | `https://api.openai.com/v1`              |
    /// | `ASSISTANT_POLL_INTERVAL_MS` | `5000`                                   |
    /// | `ASSISTANT_RUN_TIMEOUT_SECS` | `120`                                    |
    /// | `FIREBASE_API_KEY`           | unset                                    |
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
            database_url: env_or("DATABASE_URL", "postgres://localhost:5432/thera"),
            redis_url: env_opt("REDIS_URL"),
            secrets: TokenSecrets::new(
                resolve_token_secret(Scope::Access),
                resolve_token_secret(Scope::Refresh),
            ),
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            openai_assistant_id: env_or("OPENAI_ASSISTANT_ID", ""),
            openai_model: env_opt("OPENAI_MODEL"),
            openai_base_url: env_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            poll: PollPolicy {
                interval: env_duration(
                    "ASSISTANT_POLL_INTERVAL_MS",
                    Duration::from_millis,
                    DEFAULT_POLL_INTERVAL,
                ),
                timeout: env_duration(
                    "ASSISTANT_RUN_TIMEOUT_SECS",
                    Duration::from_secs,
                    DEFAULT_RUN_TIMEOUT,
                ),
            },
            firebase_api_key: env_opt("FIREBASE_API_KEY"),
        }
    }

    /// Defaults for everything but the token secrets; no external services.
    pub fn with_secrets(secrets: TokenSecrets) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            database_url: String::new(),
            redis_url: None,
            secrets,
            openai_api_key: String::new(),
            openai_assistant_id: String::new(),
            openai_model: None,
            openai_base_url: DEFAULT_BASE_URL.into(),
            poll: PollPolicy::default(),
            firebase_api_key: None,
        }
    }

    pub fn openai(&self) -> OpenAiConfig {
        OpenAiConfig {
            api_key: self.openai_api_key.clone(),
            assistant_id: self.openai_assistant_id.clone(),
            model: self.openai_model.clone(),
            base_url: self.openai_base_url.clone(),
            poll: self.poll,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("redis", &self.redis_url.is_some())
            .field("openai_assistant_id", &self.openai_assistant_id)
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("poll", &self.poll)
            .field("firebase", &self.firebase_api_key.is_some())
            .finish_non_exhaustive()
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_duration(name: &str, unit: fn(u64) -> Duration, default: Duration) -> Duration {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map(unit).unwrap_or_else(|_| {
            warn!(name, value = %raw, "invalid duration, using default");
            default
        }),
        Err(_) => default,
    }
}
