/// Profile endpoints
///
/// # Endpoints
///
/// - `GET /v1/users/me` - Current user's profile
/// - `PATCH /v1/users/me` - Update display name and/or password

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use ledgerbook_shared::{
    auth::{middleware::CurrentUser, password},
    models::user::{UpdateProfile, User, UserProfile},
};
use serde::Deserialize;
use validator::Validate;

/// Profile update request; omitted fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// New display name
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,

    /// New password (re-hashed before storage)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Returns the authenticated user's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<UserProfile>> {
    let user = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.profile()))
}

/// Updates the authenticated user's profile
///
/// A changed password invalidates nothing retroactively: existing refresh
/// tokens stay valid until rotated out or revoked.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    req.validate()?;

    let password_hash = match req.password.as_deref() {
        Some(password) => Some(password::hash_password(password)?),
        None => None,
    };

    let updated = User::update_profile(
        &state.db,
        user.id,
        UpdateProfile {
            name: req.name,
            password_hash,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(updated.profile()))
}
