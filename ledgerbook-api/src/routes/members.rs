/// Organization member endpoints
///
/// # Endpoints
///
/// - `GET /v1/organizations/:id/members` - List members (any member)
/// - `POST /v1/organizations/:id/members` - Invite a user (ADMIN or above)
/// - `PATCH /v1/organizations/:id/members/:member_id` - Change a role (ADMIN or above)
/// - `DELETE /v1/organizations/:id/members/:member_id` - Remove a member (ADMIN or above)
///
/// Two invariants sit on top of the role floor:
///
/// - The OWNER's membership is untouchable: its role cannot be changed, it
///   cannot be removed, and OWNER cannot be granted after creation.
/// - Nobody manages their own membership: changing your own role or
///   removing yourself is rejected even for admins.

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
        user::{User, UserSummary},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Roles allowed to invite, re-role and remove members
const MANAGE_ROLES: &[MemberRole] = &[MemberRole::Admin];

/// Invite request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteMemberRequest {
    /// Email of an existing user to add
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Role to grant; defaults to MEMBER. OWNER is never grantable.
    pub role: Option<MemberRole>,
}

/// Role update request
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    /// The new role. OWNER is never grantable.
    pub role: MemberRole,
}

/// A member as shown in listings and mutations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    /// Membership ID (not the user ID)
    pub id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
}

/// Lists the members of an organization
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    let scope = resolve_org_scope(&state.db, user.id, org_id).await?;
    authorize(scope.membership.role, &[])?;

    let members = Membership::list_by_org_with_users(&state.db, org_id).await?;

    Ok(Json(
        members
            .into_iter()
            .map(|m| MemberResponse {
                id: m.id,
                role: m.role,
                created_at: m.created_at,
                user: m.user,
            })
            .collect(),
    ))
}

/// Invites an existing user into the organization
///
/// # Errors
///
/// - `404 Not Found`: No user with that email
/// - `409 Conflict`: Already a member
/// - `403 Forbidden`: Caller below ADMIN, or trying to grant OWNER
pub async fn invite(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<InviteMemberRequest>,
) -> ApiResult<Json<MemberResponse>> {
    let scope = resolve_org_scope(&state.db, user.id, org_id).await?;
    authorize(scope.membership.role, MANAGE_ROLES)?;

    req.validate()?;

    let role = req.role.unwrap_or(MemberRole::Member);
    if role == MemberRole::Owner {
        return Err(owner_not_grantable());
    }

    let target = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No user found with that email".to_string()))?;

    if Membership::find_by_user_and_org(&state.db, target.id, org_id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "User is already a member of this organization".to_string(),
        ));
    }

    let membership = Membership::create(&state.db, target.id, org_id, role).await?;

    Ok(Json(MemberResponse {
        id: membership.id,
        role: membership.role,
        created_at: membership.created_at,
        user: target.summary(),
    }))
}

/// Changes a member's role
///
/// # Errors
///
/// - `404 Not Found`: No such member in this organization
/// - `403 Forbidden`: Target is the OWNER, target is the caller, or the new
///   role is OWNER
pub async fn update_role(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((org_id, member_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<MemberResponse>> {
    let scope = resolve_org_scope(&state.db, user.id, org_id).await?;
    authorize(scope.membership.role, MANAGE_ROLES)?;

    let member = Membership::find_in_org(&state.db, member_id, org_id)
        .await?
        .ok_or_else(member_not_found)?;

    if member.role == MemberRole::Owner {
        return Err(ApiError::Forbidden(
            "The owner's role cannot be changed".to_string(),
        ));
    }
    if member.user_id == user.id {
        return Err(ApiError::Forbidden(
            "You cannot change your own role".to_string(),
        ));
    }
    if req.role == MemberRole::Owner {
        return Err(owner_not_grantable());
    }

    let updated = Membership::update_role(&state.db, member.id, req.role)
        .await?
        .ok_or_else(member_not_found)?;

    let target = User::find_by_id(&state.db, updated.user_id)
        .await?
        .ok_or_else(member_not_found)?;

    Ok(Json(MemberResponse {
        id: updated.id,
        role: updated.role,
        created_at: updated.created_at,
        user: target.summary(),
    }))
}

/// Removes a member from the organization
///
/// # Errors
///
/// - `404 Not Found`: No such member in this organization
/// - `403 Forbidden`: Target is the OWNER, or target is the caller
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((org_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let scope = resolve_org_scope(&state.db, user.id, org_id).await?;
    authorize(scope.membership.role, MANAGE_ROLES)?;

    let member = Membership::find_in_org(&state.db, member_id, org_id)
        .await?
        .ok_or_else(member_not_found)?;

    if member.role == MemberRole::Owner {
        return Err(ApiError::Forbidden(
            "The owner cannot be removed".to_string(),
        ));
    }
    if member.user_id == user.id {
        return Err(ApiError::Forbidden(
            "You cannot remove yourself".to_string(),
        ));
    }

    Membership::delete(&state.db, member.id).await?;

    Ok(StatusCode::OK)
}

fn member_not_found() -> ApiError {
    ApiError::NotFound("Member not found".to_string())
}

fn owner_not_grantable() -> ApiError {
    ApiError::Forbidden("Ownership is assigned at organization creation and cannot be granted".to_string())
}
