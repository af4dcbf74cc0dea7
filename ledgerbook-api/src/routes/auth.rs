/// Session lifecycle endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Create an account (and its first organization)
/// - `POST /v1/auth/login` - Exchange credentials for a token pair
/// - `POST /v1/auth/refresh` - Rotate a refresh token into a new pair
/// - `POST /v1/auth/logout` - Revoke a refresh token (idempotent)
///
/// Every successful call hands out a fresh access/refresh pair and persists
/// exactly one refresh-token row; refresh additionally deletes exactly one
/// old row. Refresh tokens are single-use: rotation destroys the presented
/// token before the replacement exists, so a crash in between fails safe
/// (the user logs in again) rather than leaving two live tokens.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use ledgerbook_shared::{
    auth::password,
    models::{
        organization::Organization,
        refresh_token::RefreshToken,
        user::{CreateUser, User, UserSummary},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Refresh/logout request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Refresh token value
    pub refresh_token: String,
}

/// Response for register, login and refresh
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// The authenticated user
    pub user: UserSummary,

    /// Short-lived access token
    pub access_token: String,

    /// Single-use refresh token
    pub refresh_token: String,
}

/// Register a new user
///
/// Creates the account, an organization owned by it, and a first session.
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate()?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
        },
    )
    .await?;

    // Every account starts with an organization it owns; OWNER is assigned
    // only here.
    let org_name = format!("{}'s organization", user.name);
    Organization::create_with_owner(&state.db, &org_name, user.id).await?;

    let session = start_session(&state, &user).await?;
    Ok(Json(session))
}

/// Login with email and password
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password — the same error
///   either way, so the response never reveals which part failed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(invalid_credentials());
    }

    let session = start_session(&state, &user).await?;
    Ok(Json(session))
}

/// Exchange a refresh token for a new token pair
///
/// The presented token is consumed: a second refresh with the same value
/// fails, as does any use after logout.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown, expired, or already-rotated token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let stored = RefreshToken::find(&state.db, &req.refresh_token)
        .await?
        .ok_or_else(invalid_refresh)?;

    if stored.is_expired() {
        // Expired rows are collected when presented, not on a schedule
        RefreshToken::delete_by_id(&state.db, stored.id).await?;
        return Err(invalid_refresh());
    }

    // Rotate: the old row must be gone before the new one exists. A delete
    // that finds nothing means a concurrent refresh already won this token.
    let deleted = RefreshToken::delete_by_id(&state.db, stored.id).await?;
    if !deleted {
        return Err(invalid_refresh());
    }

    let user = User::find_by_id(&state.db, stored.user_id)
        .await?
        .ok_or_else(invalid_refresh)?;

    let session = start_session(&state, &user).await?;
    Ok(Json(session))
}

/// Revoke a refresh token
///
/// Idempotent: revoking an unknown or already-revoked token is a success.
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<StatusCode> {
    RefreshToken::delete_by_token(&state.db, &req.refresh_token).await?;

    Ok(StatusCode::OK)
}

/// Issues a token pair for a user and persists the refresh half
async fn start_session(state: &AppState, user: &User) -> Result<SessionResponse, ApiError> {
    let pair = state.tokens.issue_pair(user.id, &user.email)?;

    let expires_at = Utc::now() + state.tokens.refresh_ttl();
    RefreshToken::create(&state.db, user.id, &pair.refresh_token, expires_at).await?;

    Ok(SessionResponse {
        user: user.summary(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    })
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

fn invalid_refresh() -> ApiError {
    ApiError::Unauthorized("Invalid or expired refresh token".to_string())
}
