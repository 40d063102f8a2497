//! Profile reads and updates.

use thera_core::auth::session::store_access_snapshot;
use thera_core::models::user::{ProfileUpdate, User};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::services::auth::is_valid_email;

/// The current user record from the durable store.
pub async fn get_profile(state: &AppState, user_id: Uuid) -> AppResult<User> {
    state
        .users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Apply a partial update and refresh the snapshot cached under the
/// presenting access token. Other live tokens keep their older snapshot
/// until they expire.
pub async fn update_profile(
    state: &AppState,
    caller: &AuthenticatedUser,
    update: ProfileUpdate,
) -> AppResult<User> {
    if update.is_empty() {
        return Err(AppError::Validation("Nothing to update".into()));
    }
    if let Some(email) = &update.email
        && !is_valid_email(email)
    {
        return Err(AppError::Validation(
            "Field 'email' must contain a valid email address".into(),
        ));
    }

    let user = state
        .users
        .update_profile(caller.user.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    store_access_snapshot(state.cache.as_ref(), &caller.token, &user).await?;
    Ok(user)
}
