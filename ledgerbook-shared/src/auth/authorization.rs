/// Organization-scoped authorization
///
/// Two checks guard every organization-scoped operation, in order:
///
/// 1. **Membership resolution** ([`resolve_org_scope`]): the caller must
///    hold a membership in the target organization. A missing membership is
///    reported identically to a missing organization — one lookup, one
///    error — so non-members cannot probe which organizations exist.
/// 2. **Role gate** ([`authorize`]): the operation declares the roles it
///    accepts and the member's role is compared against that requirement.
///
/// Required roles are declared as explicit constants next to each handler;
/// there is no registry or reflection involved.
///
/// # Example
///
/// ```no_run
/// use ledgerbook_shared::auth::authorization::{authorize, resolve_org_scope};
/// use ledgerbook_shared::models::membership::MemberRole;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// const REQUIRED: &[MemberRole] = &[MemberRole::Admin];
///
/// # async fn example(pool: PgPool, user_id: Uuid, org_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let scope = resolve_org_scope(&pool, user_id, org_id).await?;
/// authorize(scope.membership.role, REQUIRED)?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::membership::{MemberRole, Membership};
use crate::models::organization::Organization;

/// Error type for organization-scoped access checks
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The caller has no membership in the organization — or the
    /// organization does not exist. Deliberately one variant for both.
    #[error("Organization not found")]
    OrganizationNotFound,

    /// The caller is a member but its role is below the requirement
    #[error("Insufficient role: requires at least {required}, has {actual}")]
    InsufficientRole {
        required: MemberRole,
        actual: MemberRole,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The resolved tenant context for one request
///
/// Attached for downstream handlers so tenant-scoped queries never have to
/// re-derive which organization they are operating in.
#[derive(Debug, Clone)]
pub struct OrgScope {
    /// The target organization
    pub organization: Organization,

    /// The caller's membership in it
    pub membership: Membership,
}

/// Resolves the caller's membership in an organization
///
/// # Errors
///
/// `AccessError::OrganizationNotFound` when no membership row exists —
/// whether because the organization is absent or because the caller simply
/// is not in it.
pub async fn resolve_org_scope(
    pool: &PgPool,
    user_id: Uuid,
    organization_id: Uuid,
) -> Result<OrgScope, AccessError> {
    let (membership, organization) =
        Membership::find_with_organization(pool, user_id, organization_id)
            .await?
            .ok_or(AccessError::OrganizationNotFound)?;

    Ok(OrgScope {
        organization,
        membership,
    })
}

/// Checks a member's role against an operation's declared requirement
///
/// An empty requirement is a pure membership check: any member passes.
/// Otherwise the *lowest* level among the declared roles is the floor and
/// the member passes when its own level reaches it.
///
/// Declaring several roles therefore behaves as a permissive union (the
/// least-privileged one wins), not an intersection. This mirrors the
/// upstream contract this service implements; a stricter policy would be a
/// change to this one function, with no call sites touched.
pub fn authorize(actual: MemberRole, required: &[MemberRole]) -> Result<(), AccessError> {
    let Some(floor) = required.iter().copied().min_by_key(|r| r.level()) else {
        return Ok(());
    };

    if actual.at_least(floor) {
        Ok(())
    } else {
        Err(AccessError::InsufficientRole {
            required: floor,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [MemberRole; 4] = [
        MemberRole::Owner,
        MemberRole::Admin,
        MemberRole::Member,
        MemberRole::Viewer,
    ];

    #[test]
    fn test_empty_requirement_admits_any_member() {
        for role in ALL_ROLES {
            assert!(authorize(role, &[]).is_ok());
        }
    }

    #[test]
    fn test_single_requirement_is_a_floor() {
        // Allowed iff level(actual) >= level(required)
        assert!(authorize(MemberRole::Owner, &[MemberRole::Admin]).is_ok());
        assert!(authorize(MemberRole::Admin, &[MemberRole::Admin]).is_ok());
        assert!(authorize(MemberRole::Member, &[MemberRole::Admin]).is_err());
        assert!(authorize(MemberRole::Viewer, &[MemberRole::Admin]).is_err());

        assert!(authorize(MemberRole::Member, &[MemberRole::Member]).is_ok());
        assert!(authorize(MemberRole::Viewer, &[MemberRole::Member]).is_err());

        for role in ALL_ROLES {
            assert!(authorize(role, &[MemberRole::Viewer]).is_ok());
        }
    }

    #[test]
    fn test_owner_floor_admits_only_owner() {
        assert!(authorize(MemberRole::Owner, &[MemberRole::Owner]).is_ok());
        assert!(authorize(MemberRole::Admin, &[MemberRole::Owner]).is_err());
        assert!(authorize(MemberRole::Member, &[MemberRole::Owner]).is_err());
        assert!(authorize(MemberRole::Viewer, &[MemberRole::Owner]).is_err());
    }

    #[test]
    fn test_multiple_requirements_take_the_minimum() {
        // Declaring {ADMIN, VIEWER} is equivalent to declaring just VIEWER
        let required = &[MemberRole::Admin, MemberRole::Viewer];

        assert!(authorize(MemberRole::Viewer, required).is_ok());
        assert!(authorize(MemberRole::Member, required).is_ok());
        assert!(authorize(MemberRole::Admin, required).is_ok());

        // And {OWNER, MEMBER} admits members and above
        let required = &[MemberRole::Owner, MemberRole::Member];
        assert!(authorize(MemberRole::Member, required).is_ok());
        assert!(authorize(MemberRole::Viewer, required).is_err());
    }

    #[test]
    fn test_denial_reports_floor_and_actual() {
        let err = authorize(MemberRole::Viewer, &[MemberRole::Admin]).unwrap_err();

        match err {
            AccessError::InsufficientRole { required, actual } => {
                assert_eq!(required, MemberRole::Admin);
                assert_eq!(actual, MemberRole::Viewer);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
