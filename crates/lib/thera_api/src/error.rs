//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thera_core::assistant::AssistantError;
use thera_core::auth::AuthError;
use thera_core::cache::CacheError;
use thera_core::identity::IdentityError;
use thera_core::store::StoreError;
use thera_core::threads::ThreadError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Unavailable(m) => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable", m.as_str())
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::Internal(format!("session cache: {e}"))
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) => {
                AppError::Validation("Email or phone is already in use".into())
            }
            StoreError::Db(e) => AppError::Internal(format!("user store: {e}")),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::TokenError(msg) => AppError::Unauthorized(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Cache(e) => AppError::from(e),
            AuthError::Store(e) => AppError::from(e),
            AuthError::Entropy(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<AssistantError> for AppError {
    fn from(e: AssistantError) -> Self {
        match e {
            AssistantError::Timeout(_) => {
                AppError::Unavailable("The assistant did not answer in time".into())
            }
            other => AppError::Internal(format!("assistant: {other}")),
        }
    }
}

impl From<ThreadError> for AppError {
    fn from(e: ThreadError) -> Self {
        match e {
            ThreadError::UserNotFound(_) => AppError::NotFound("User not found".into()),
            ThreadError::InvalidAnonymousSession(_) => {
                AppError::Validation("Invalid anonymous session id".into())
            }
            ThreadError::Cache(e) => AppError::from(e),
            ThreadError::Store(e) => AppError::from(e),
            ThreadError::Assistant(e) => AppError::from(e),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::InvalidCredential(_) => {
                AppError::Unauthorized("Invalid credentials".into())
            }
            IdentityError::Provider(msg) => {
                error!(detail = %msg, "identity provider failure");
                AppError::Unavailable("Identity provider unavailable".into())
            }
            IdentityError::Config(msg) => AppError::Internal(msg),
        }
    }
}
