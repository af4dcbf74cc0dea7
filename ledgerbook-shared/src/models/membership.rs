/// Membership model and database operations
///
/// Implements the many-to-many relationship between users and organizations
/// with role-based access control. A user holds at most one role per
/// organization (`UNIQUE (user_id, organization_id)`).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE member_role AS ENUM ('OWNER', 'ADMIN', 'MEMBER', 'VIEWER');
///
/// CREATE TABLE organization_members (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     role member_role NOT NULL DEFAULT 'MEMBER',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, organization_id)
/// );
/// ```
///
/// # Roles
///
/// Ordered by authority: OWNER > ADMIN > MEMBER > VIEWER.
///
/// - **OWNER**: full control; the only role that may delete the
///   organization. Assigned exactly once, at organization creation.
/// - **ADMIN**: manages members and organization settings
/// - **MEMBER**: works with the organization's bookkeeping data
/// - **VIEWER**: read-only access

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use super::organization::Organization;
use super::user::UserSummary;

/// Role of a user within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    /// Full control; can delete the organization. Exactly one per org.
    Owner,

    /// Can manage members and organization settings
    Admin,

    /// Can create and edit bookkeeping data
    Member,

    /// Read-only access
    Viewer,
}

impl MemberRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "OWNER",
            MemberRole::Admin => "ADMIN",
            MemberRole::Member => "MEMBER",
            MemberRole::Viewer => "VIEWER",
        }
    }

    /// Numeric authority level used for comparisons
    ///
    /// Hierarchy: OWNER(4) > ADMIN(3) > MEMBER(2) > VIEWER(1)
    pub fn level(&self) -> u8 {
        match self {
            MemberRole::Owner => 4,
            MemberRole::Admin => 3,
            MemberRole::Member => 2,
            MemberRole::Viewer => 1,
        }
    }

    /// Checks whether this role meets a required minimum role
    pub fn at_least(&self, required: MemberRole) -> bool {
        self.level() >= required.level()
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership row joining a user to an organization with a role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Membership ID
    pub id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// Role within the organization
    pub role: MemberRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

/// A membership joined with the member's user record, for listings
#[derive(Debug, Clone)]
pub struct MemberWithUser {
    pub id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
}

/// A membership joined with its organization, for "my organizations" views
#[derive(Debug, Clone)]
pub struct MembershipWithOrganization {
    pub organization: Organization,
    pub role: MemberRole,
    pub member_count: i64,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    role: MemberRole,
    created_at: DateTime<Utc>,
    user_id: Uuid,
    email: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct OrgMembershipRow {
    org_id: Uuid,
    org_name: String,
    org_created_at: DateTime<Utc>,
    org_updated_at: DateTime<Utc>,
    role: MemberRole,
    member_count: i64,
}

impl Membership {
    /// Creates a new membership (adds a user to an organization)
    ///
    /// # Errors
    ///
    /// Returns an error if the membership already exists (unique constraint
    /// violation), a parent row is missing, or the database is unavailable.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        organization_id: Uuid,
        role: MemberRole,
    ) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO organization_members (user_id, organization_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, organization_id, role, created_at
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .bind(role)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Finds the unique membership of a user in an organization
    pub async fn find_by_user_and_org(
        pool: &PgPool,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, user_id, organization_id, role, created_at
            FROM organization_members
            WHERE user_id = $1 AND organization_id = $2
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Finds a membership together with its organization in one lookup
    ///
    /// This is the single path every organization-scoped request goes
    /// through: a missing membership and a missing organization are
    /// indistinguishable to the caller.
    pub async fn find_with_organization(
        pool: &PgPool,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<(Self, Organization)>, sqlx::Error> {
        #[derive(sqlx::FromRow)]
        struct ScopeRow {
            id: Uuid,
            user_id: Uuid,
            organization_id: Uuid,
            role: MemberRole,
            created_at: DateTime<Utc>,
            org_name: String,
            org_created_at: DateTime<Utc>,
            org_updated_at: DateTime<Utc>,
        }

        let row = sqlx::query_as::<_, ScopeRow>(
            r#"
            SELECT m.id, m.user_id, m.organization_id, m.role, m.created_at,
                   o.name AS org_name,
                   o.created_at AS org_created_at,
                   o.updated_at AS org_updated_at
            FROM organization_members m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.user_id = $1 AND m.organization_id = $2
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| {
            let organization = Organization {
                id: r.organization_id,
                name: r.org_name,
                created_at: r.org_created_at,
                updated_at: r.org_updated_at,
            };
            let membership = Membership {
                id: r.id,
                user_id: r.user_id,
                organization_id: r.organization_id,
                role: r.role,
                created_at: r.created_at,
            };
            (membership, organization)
        }))
    }

    /// Finds a membership by its ID, scoped to an organization
    ///
    /// The organization filter keeps member management from reaching across
    /// tenants by guessing membership IDs.
    pub async fn find_in_org(
        pool: &PgPool,
        member_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, user_id, organization_id, role, created_at
            FROM organization_members
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(member_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Updates a membership's role
    ///
    /// Returns the updated membership, or None if it no longer exists.
    pub async fn update_role(
        pool: &PgPool,
        member_id: Uuid,
        role: MemberRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE organization_members
            SET role = $2
            WHERE id = $1
            RETURNING id, user_id, organization_id, role, created_at
            "#,
        )
        .bind(member_id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Deletes a membership (removes the user from the organization)
    ///
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, member_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM organization_members WHERE id = $1")
            .bind(member_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all members of an organization with their user records
    pub async fn list_by_org_with_users(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<MemberWithUser>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.id, m.role, m.created_at,
                   u.id AS user_id, u.email, u.name
            FROM organization_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| MemberWithUser {
                id: r.id,
                role: r.role,
                created_at: r.created_at,
                user: UserSummary {
                    id: r.user_id,
                    email: r.email,
                    name: r.name,
                },
            })
            .collect())
    }

    /// Lists all organizations a user belongs to, with role and member count
    pub async fn list_by_user_with_orgs(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<MembershipWithOrganization>, sqlx::Error> {
        let rows = sqlx::query_as::<_, OrgMembershipRow>(
            r#"
            SELECT o.id AS org_id, o.name AS org_name,
                   o.created_at AS org_created_at, o.updated_at AS org_updated_at,
                   m.role,
                   (SELECT COUNT(*) FROM organization_members mm
                    WHERE mm.organization_id = o.id) AS member_count
            FROM organization_members m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.user_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| MembershipWithOrganization {
                organization: Organization {
                    id: r.org_id,
                    name: r.org_name,
                    created_at: r.org_created_at,
                    updated_at: r.org_updated_at,
                },
                role: r.role,
                member_count: r.member_count,
            })
            .collect())
    }

    /// Counts members in an organization
    pub async fn count_by_org(pool: &PgPool, organization_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM organization_members WHERE organization_id = $1")
                .bind(organization_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
