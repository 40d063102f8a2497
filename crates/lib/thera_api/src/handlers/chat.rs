//! Chat handlers for signed-in users and anonymous sessions.
//!
//! Thread bookkeeping lives in [`thera_core::threads::ThreadBinder`]; these
//! handlers only validate input and pick the principal.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use thera_core::models::chat::{Message, Principal};
use tracing::debug;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AnonSessionResponse, MessageRequest, StatusResponse};

fn message_text(body: &MessageRequest) -> AppResult<&str> {
    if body.text.trim().is_empty() {
        return Err(AppError::Validation("Field 'text' must be filled".into()));
    }
    Ok(&body.text)
}

fn anonymous(id: &str) -> AppResult<Principal> {
    Uuid::parse_str(id)
        .map(Principal::Anonymous)
        .map_err(|_| AppError::Validation("Invalid anonymous session id".into()))
}

async fn send(state: &AppState, principal: Principal, text: &str) -> AppResult<Json<Message>> {
    // Dropped with the request future when the client goes away.
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    let reply = state.threads.send_message(principal, text, &cancel).await?;
    Ok(Json(Message::reply(reply)))
}

// ---------------------------------------------------------------------------
// Signed-in users
// ---------------------------------------------------------------------------

/// `POST /chat/start`: start a new conversation.
pub async fn start_chat_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> AppResult<Json<StatusResponse>> {
    state
        .threads
        .start_new_thread(Principal::User(caller.user.id))
        .await?;
    Ok(Json(StatusResponse {
        message: "chat started".into(),
    }))
}

/// `POST /chat/message`: send a message and wait for the reply.
pub async fn message_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<MessageRequest>,
) -> AppResult<Json<Message>> {
    let text = message_text(&body)?;
    send(&state, Principal::User(caller.user.id), text).await
}

/// `GET /chat/messages`: the conversation so far, oldest first.
pub async fn messages_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<Message>>> {
    let messages = state
        .threads
        .list_messages(Principal::User(caller.user.id))
        .await?;
    Ok(Json(messages))
}

// ---------------------------------------------------------------------------
// Anonymous sessions
// ---------------------------------------------------------------------------

/// `POST /chat/anon/start`: open an anonymous session.
pub async fn start_anon_chat_handler(
    State(state): State<AppState>,
) -> AppResult<Json<AnonSessionResponse>> {
    let (id, _thread) = state.threads.start_anonymous_session().await?;
    debug!(session_id = %id, "anonymous session started");
    Ok(Json(AnonSessionResponse { id: id.to_string() }))
}

/// `POST /chat/anon/{id}/message`
pub async fn anon_message_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MessageRequest>,
) -> AppResult<Json<Message>> {
    let principal = anonymous(&id)?;
    let text = message_text(&body)?;
    send(&state, principal, text).await
}

/// `GET /chat/anon/{id}/messages`
pub async fn anon_messages_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Message>>> {
    let messages = state.threads.list_messages(anonymous(&id)?).await?;
    Ok(Json(messages))
}
