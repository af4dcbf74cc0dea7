/// Request authentication for axum
///
/// Resolves the identity behind an inbound request from its
/// `Authorization: Bearer <token>` header. On success the handler finds a
/// [`CurrentUser`] in the request extensions; on any failure the request is
/// rejected before handler logic runs.
///
/// Every failure mode — missing header, malformed value, bad signature,
/// expiry — maps to the same 401 at the API boundary, so a probing client
/// learns nothing from the response shape.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tokens::{Claims, TokenIssuer};

/// Authenticated identity attached to request extensions
///
/// # Example
///
/// ```no_run
/// use axum::Extension;
/// use ledgerbook_shared::auth::middleware::CurrentUser;
///
/// async fn handler(Extension(user): Extension<CurrentUser>) -> String {
///     format!("Hello, {}", user.email)
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Authenticated user ID
    pub id: Uuid,

    /// Email from the token claims
    pub email: String,
}

impl CurrentUser {
    /// Builds the identity from verified claims
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email.clone(),
        }
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header is not a Bearer token
    #[error("Expected Bearer token")]
    InvalidFormat,

    /// Token verification failed
    #[error("Invalid or expired token")]
    InvalidToken,
}

/// Extracts the bearer token from a request's headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)
}

/// Authenticates a request from its headers
///
/// Extracts the bearer token, verifies it as an access token, and returns
/// the resolved identity.
pub fn authenticate(issuer: &TokenIssuer, headers: &HeaderMap) -> Result<CurrentUser, AuthError> {
    let token = bearer_token(headers)?;

    let claims = issuer
        .verify_access(token)
        .map_err(|_| AuthError::InvalidToken)?;

    Ok(CurrentUser::from_claims(&claims))
}
