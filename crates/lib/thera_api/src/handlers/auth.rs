//! Authentication request handlers.

use axum::Json;
use axum::extract::{Path, State};

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    EmailLoginRequest, FirebaseLoginRequest, PhoneLoginRequest, RegisterRequest, TokenResponse,
};
use crate::services::auth;

/// `POST /register`: create a local account and sign it in.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::register(&state, body).await?;
    Ok(Json(resp))
}

/// `POST /auth/phone`: authenticate with phone + password.
pub async fn login_phone_handler(
    State(state): State<AppState>,
    Json(body): Json<PhoneLoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login_phone(&state, &body.phone, &body.password).await?;
    Ok(Json(resp))
}

/// `POST /auth/email`: authenticate with email + password.
pub async fn login_email_handler(
    State(state): State<AppState>,
    Json(body): Json<EmailLoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login_email(&state, &body.email, &body.password).await?;
    Ok(Json(resp))
}

/// `GET /token/refresh/{token}`: exchange a refresh token for a new pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::refresh(&state, &token).await?;
    Ok(Json(resp))
}

/// `POST /auth/firebase`: sign in with a Firebase ID token.
pub async fn firebase_handler(
    State(state): State<AppState>,
    Json(body): Json<FirebaseLoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::firebase_login(&state, &body.id_token).await?;
    Ok(Json(resp))
}
