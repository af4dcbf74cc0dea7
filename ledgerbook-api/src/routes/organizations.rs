/// Organization endpoints
///
/// # Endpoints
///
/// - `GET /v1/organizations` - Organizations the caller belongs to
/// - `POST /v1/organizations` - Create an organization (caller becomes OWNER)
/// - `GET /v1/organizations/:id` - Organization details (any member)
/// - `PATCH /v1/organizations/:id` - Rename (ADMIN or above)
/// - `DELETE /v1/organizations/:id` - Delete (OWNER only)
///
/// Scoped reads and the rename go through the membership resolver, so a
/// caller without a membership gets the same 404 whether the organization
/// exists or not. Deletion checks the caller's membership directly and
/// answers 403, because only one person in the world may do it anyway.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use ledgerbook_shared::{
    auth::{
        authorization::{authorize, resolve_org_scope},
        middleware::CurrentUser,
    },
    models::{
        membership::{MemberRole, Membership},
        organization::Organization,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Roles allowed to rename an organization
const UPDATE_ROLES: &[MemberRole] = &[MemberRole::Admin];

/// Create/rename request
#[derive(Debug, Deserialize, Validate)]
pub struct OrganizationRequest {
    /// Organization name
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
}

/// Organization as seen by one of its members
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
    pub id: Uuid,
    pub name: String,

    /// The caller's own role in this organization
    pub role: MemberRole,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizationResponse {
    fn new(organization: Organization, role: MemberRole, member_count: i64) -> Self {
        Self {
            id: organization.id,
            name: organization.name,
            role,
            member_count,
            created_at: organization.created_at,
            updated_at: organization.updated_at,
        }
    }
}

/// Lists the caller's organizations with role and member count
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<OrganizationResponse>>> {
    let memberships = Membership::list_by_user_with_orgs(&state.db, user.id).await?;

    let organizations = memberships
        .into_iter()
        .map(|m| OrganizationResponse::new(m.organization, m.role, m.member_count))
        .collect();

    Ok(Json(organizations))
}

/// Creates an organization owned by the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<OrganizationRequest>,
) -> ApiResult<Json<OrganizationResponse>> {
    req.validate()?;

    let (organization, membership) =
        Organization::create_with_owner(&state.db, &req.name, user.id).await?;

    Ok(Json(OrganizationResponse::new(
        organization,
        membership.role,
        1,
    )))
}

/// Returns one organization the caller is a member of
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Json<OrganizationResponse>> {
    let scope = resolve_org_scope(&state.db, user.id, org_id).await?;
    authorize(scope.membership.role, &[])?;

    let member_count = Membership::count_by_org(&state.db, org_id).await?;

    Ok(Json(OrganizationResponse::new(
        scope.organization,
        scope.membership.role,
        member_count,
    )))
}

/// Renames an organization
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<OrganizationRequest>,
) -> ApiResult<Json<OrganizationResponse>> {
    let scope = resolve_org_scope(&state.db, user.id, org_id).await?;
    authorize(scope.membership.role, UPDATE_ROLES)?;

    req.validate()?;

    let organization = Organization::update_name(&state.db, org_id, &req.name)
        .await?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    let member_count = Membership::count_by_org(&state.db, org_id).await?;

    Ok(Json(OrganizationResponse::new(
        organization,
        scope.membership.role,
        member_count,
    )))
}

/// Deletes an organization
///
/// Restricted to the OWNER specifically — ADMIN is not enough. Memberships
/// are removed before the organization row.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let membership = Membership::find_by_user_and_org(&state.db, user.id, org_id).await?;

    match membership {
        Some(m) if m.role == MemberRole::Owner => {}
        _ => {
            return Err(ApiError::Forbidden(
                "Only the owner can delete an organization".to_string(),
            ))
        }
    }

    Organization::delete(&state.db, org_id).await?;

    Ok(StatusCode::OK)
}
