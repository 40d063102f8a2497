//! # thera_api
//!
//! HTTP API library for Thera.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use thera_core::assistant::Assistant;
use thera_core::cache::SessionCache;
use thera_core::identity::IdentityProvider;
use thera_core::store::UserStore;
use thera_core::threads::ThreadBinder;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, chat, health, profile};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Token sessions and thread bindings.
    pub cache: Arc<dyn SessionCache>,
    /// Durable user records.
    pub users: Arc<dyn UserStore>,
    pub assistant: Arc<dyn Assistant>,
    /// Federated login; `None` disables `/auth/firebase`.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub threads: Arc<ThreadBinder>,
    /// Cancelled on shutdown; in-flight assistant runs stop waiting.
    pub shutdown: CancellationToken,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        cache: Arc<dyn SessionCache>,
        users: Arc<dyn UserStore>,
        assistant: Arc<dyn Assistant>,
        identity: Option<Arc<dyn IdentityProvider>>,
        config: ApiConfig,
    ) -> Self {
        let threads = Arc::new(ThreadBinder::new(
            cache.clone(),
            users.clone(),
            assistant.clone(),
        ));
        Self {
            cache,
            users,
            assistant,
            identity,
            threads,
            shutdown: CancellationToken::new(),
            config,
        }
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/", get(health::health))
        .route("/register", post(auth::register_handler))
        .route("/auth/phone", post(auth::login_phone_handler))
        .route("/auth/email", post(auth::login_email_handler))
        .route("/auth/firebase", post(auth::firebase_handler))
        .route("/token/refresh/{token}", get(auth::refresh_handler))
        .route("/chat/anon/start", post(chat::start_anon_chat_handler))
        .route("/chat/anon/{id}/message", post(chat::anon_message_handler))
        .route("/chat/anon/{id}/messages", get(chat::anon_messages_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/profile", get(profile::profile_handler))
        .route("/profile/update", patch(profile::update_profile_handler))
        .route("/chat/start", post(chat::start_chat_handler))
        .route("/chat/message", post(chat::message_handler))
        .route("/chat/messages", get(chat::messages_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
