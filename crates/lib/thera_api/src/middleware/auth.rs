//! Authentication middleware: bearer token extraction and session lookup.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use thera_core::auth::session::lookup_access;
use thera_core::cache::SessionCache;
use thera_core::models::user::User;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

const MALFORMED_HEADER: &str = "Missing or malformed authorization header";
const INVALID_TOKEN: &str = "Invalid or expired token";

/// The caller resolved from its access token, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User snapshot cached when the token was issued or last refreshed.
    pub user: User,
    /// The presented access token.
    pub token: String,
}

/// Extract the token from `Bearer <token>`.
///
/// The header must split on single spaces into exactly two parts, the first
/// literally `Bearer` and the second non-empty.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Resolve the caller from a raw `Authorization` header value.
pub async fn authenticate(
    cache: &dyn SessionCache,
    header: Option<&str>,
) -> Result<AuthenticatedUser, AppError> {
    let token = header
        .and_then(parse_bearer)
        .ok_or_else(|| AppError::Unauthorized(MALFORMED_HEADER.into()))?;

    let user = lookup_access(cache, token)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.into()))?;

    Ok(AuthenticatedUser {
        user,
        token: token.to_string(),
    })
}

/// Axum middleware: authenticates the request and injects
/// `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let caller = authenticate(state.cache.as_ref(), header).await?;

    debug!(user_id = %caller.user.id, "request authenticated");
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}
