//! Profile handlers.

use axum::extract::State;
use axum::{Extension, Json};
use thera_core::models::user::{ProfileUpdate, User};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::services::profile;

/// `GET /profile`: the caller's current record.
pub async fn profile_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> AppResult<Json<User>> {
    let user = profile::get_profile(&state, caller.user.id).await?;
    Ok(Json(user))
}

/// `PATCH /profile/update`: change phone, email, name or surname.
pub async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<ProfileUpdate>,
) -> AppResult<Json<User>> {
    let user = profile::update_profile(&state, &caller, body).await?;
    Ok(Json(user))
}
