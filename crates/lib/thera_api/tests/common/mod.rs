//! Shared harness: the full router over in-memory collaborators.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use thera_api::config::ApiConfig;
use thera_api::{AppState, router};
use thera_core::assistant::scripted::ScriptedAssistant;
use thera_core::auth::session::TokenSecrets;
use thera_core::cache::MemorySessionCache;
use thera_core::identity::IdentityProvider;
use thera_core::identity::fixed::FixedIdentityProvider;
use thera_core::store::MemoryUserStore;
use tower::ServiceExt;

pub struct TestApp {
    pub state: AppState,
    pub cache: Arc<MemorySessionCache>,
    pub users: Arc<MemoryUserStore>,
    pub assistant: Arc<ScriptedAssistant>,
    pub identity: Arc<FixedIdentityProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(ScriptedAssistant::new(), true)
    }

    pub fn with_assistant(assistant: ScriptedAssistant) -> Self {
        Self::build(assistant, true)
    }

    /// No identity provider configured.
    pub fn without_identity() -> Self {
        Self::build(ScriptedAssistant::new(), false)
    }

    fn build(assistant: ScriptedAssistant, with_identity: bool) -> Self {
        let cache = Arc::new(MemorySessionCache::new());
        let users = Arc::new(MemoryUserStore::new());
        let assistant = Arc::new(assistant);
        let identity = Arc::new(FixedIdentityProvider::new());
        let config = test_config();
        let provider: Option<Arc<dyn IdentityProvider>> = if with_identity {
            Some(identity.clone())
        } else {
            None
        };
        let state = AppState::new(
            cache.clone(),
            users.clone(),
            assistant.clone(),
            provider,
            config,
        );
        Self {
            state,
            cache,
            users,
            assistant,
            identity,
        }
    }

    /// Send a request; the body is parsed as JSON, or kept as a string.
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        send_to(self.state.clone(), req).await
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    /// Register `email` and return `(accessToken, refreshToken)`.
    pub async fn register(&self, email: &str, phone: &str) -> (String, String) {
        let (status, body) = self.post("/register", None, registration(email, phone)).await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        tokens(&body)
    }
}

pub fn registration(email: &str, phone: &str) -> Value {
    json!({
        "email": email,
        "phone": phone,
        "password": "correct horse",
        "rePassword": "correct horse",
        "name": "Ada",
        "surname": "Lovelace"
    })
}

pub fn tokens(body: &Value) -> (String, String) {
    let access = body["accessToken"].as_str().unwrap().to_string();
    let refresh = body["refreshToken"].as_str().unwrap().to_string();
    (access, refresh)
}

pub fn test_config() -> ApiConfig {
    ApiConfig::with_secrets(TokenSecrets::new(
        "test-access-secret",
        "test-refresh-secret",
    ))
}

/// Send a request through a router over `state`.
pub async fn send_to(state: AppState, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}
