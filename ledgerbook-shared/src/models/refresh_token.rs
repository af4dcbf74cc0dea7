/// Refresh token storage
///
/// One row per live refresh token. Rows are created on register, login and
/// refresh; deleted on rotation and logout; and garbage-collected lazily
/// when an expired token is presented.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE refresh_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     token TEXT NOT NULL UNIQUE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A stored refresh token
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshToken {
    /// Row ID
    pub id: Uuid,

    /// The opaque token value handed to the client, unique across all users
    pub token: String,

    /// Owning user
    pub user_id: Uuid,

    /// Absolute expiry; past this instant the row only awaits collection
    pub expires_at: DateTime<Utc>,

    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Persists a freshly issued refresh token
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let stored = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, token, user_id, expires_at, created_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(stored)
    }

    /// Looks up a stored token by its value
    pub async fn find(pool: &PgPool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        let stored = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, token, user_id, expires_at, created_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(stored)
    }

    /// Deletes a stored token by row ID
    ///
    /// Returns true if a row was deleted. The rotation path checks this:
    /// when two refreshes race on the same token, only one delete reports a
    /// row and the other request must fail.
    pub async fn delete_by_id(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a stored token by value
    ///
    /// Returns true if a row was deleted; false is not an error. This is the
    /// logout path, which is idempotent by contract.
    pub async fn delete_by_token(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether the stored expiry has passed
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_expiring_in(seconds: i64) -> RefreshToken {
        RefreshToken {
            id: Uuid::new_v4(),
            token: "opaque-token-value".to_string(),
            user_id: Uuid::new_v4(),
            expires_at: Utc::now() + Duration::seconds(seconds),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_expired() {
        assert!(!token_expiring_in(3600).is_expired());
        assert!(token_expiring_in(-1).is_expired());
    }
}
