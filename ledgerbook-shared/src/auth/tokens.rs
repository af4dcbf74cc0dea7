/// Access/refresh token issuance and verification
///
/// Tokens are signed with HS256. Access and refresh tokens carry the same
/// claims (`sub` = user ID, `email`) and differ only in signing secret and
/// lifetime: an access token can never be replayed as a refresh token or
/// vice versa, because each kind verifies against its own secret.
///
/// Lifetimes are configuration, not constants: access tokens live minutes,
/// refresh tokens days. The refresh lifetime is also used for the stored
/// refresh-token row, so the signed expiry and the row expiry agree.
///
/// # Example
///
/// ```
/// use ledgerbook_shared::auth::tokens::TokenIssuer;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let issuer = TokenIssuer::new(
///     "access-secret-at-least-32-bytes-long!!",
///     "refresh-secret-at-least-32-bytes-long!",
///     Duration::minutes(15),
///     Duration::days(7),
/// );
///
/// let user_id = Uuid::new_v4();
/// let pair = issuer.issue_pair(user_id, "user@example.com")?;
///
/// let claims = issuer.verify_access(&pair.access_token)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim pinned into every token
const ISSUER: &str = "ledgerbook";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to sign a token; aborts the whole pair
    #[error("Failed to sign token: {0}")]
    Signing(String),

    /// Verification failed. Malformed input, bad signature, wrong issuer and
    /// expiry all land here: callers answer with one uniform 401 and must
    /// not be able to tell these cases apart.
    #[error("Invalid or expired token")]
    Invalid,
}

/// Claims carried by both token kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: Uuid,

    /// The user's email at issuance time
    pub email: String,

    /// Issuer - always "ledgerbook"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    fn new(user_id: Uuid, email: &str, lifetime: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + lifetime;

        Self {
            sub: user_id,
            email: email.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
        }
    }
}

/// An access token and its companion refresh token
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Short-lived credential presented on every request
    pub access_token: String,

    /// Long-lived credential exchanged (once) for a new pair
    pub refresh_token: String,
}

/// Signs and verifies both token kinds
///
/// Construct one per process from configuration and share it behind an Arc.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Creates an issuer from the two secrets and their lifetimes
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    /// The configured refresh lifetime
    ///
    /// Callers persisting the refresh-token row use this for the row expiry,
    /// keeping the stored expiry and the signed expiry consistent.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issues an access/refresh pair for a user
    ///
    /// The two signatures are independent; if either fails no pair is
    /// returned.
    pub fn issue_pair(&self, user_id: Uuid, email: &str) -> Result<TokenPair, TokenError> {
        let access_token = sign(
            Claims::new(user_id, email, self.access_ttl),
            &self.access_secret,
        )?;
        let refresh_token = sign(
            Claims::new(user_id, email, self.refresh_ttl),
            &self.refresh_secret,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verifies an access token and extracts its claims
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.access_secret)
    }

    /// Verifies a refresh token and extracts its claims
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.refresh_secret)
    }
}

fn sign(claims: Claims, secret: &str) -> Result<String, TokenError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, &claims, &key).map_err(|e| TokenError::Signing(e.to_string()))
}

fn verify(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| TokenError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_issuer() -> TokenIssuer {
        TokenIssuer::new(
            "access-secret-for-tests-32-bytes-min!!",
            "refresh-secret-for-tests-32-bytes-min!",
            Duration::minutes(15),
            Duration::days(7),
        )
    }

    #[test]
    fn test_issue_and_verify_pair() {
        let issuer = test_issuer();
        let user_id = Uuid::new_v4();

        let pair = issuer.issue_pair(user_id, "user@example.com").unwrap();

        let access = issuer.verify_access(&pair.access_token).unwrap();
        assert_eq!(access.sub, user_id);
        assert_eq!(access.email, "user@example.com");
        assert_eq!(access.iss, ISSUER);

        let refresh = issuer.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, user_id);
        assert_eq!(refresh.email, "user@example.com");
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let issuer = test_issuer();
        let pair = issuer.issue_pair(Uuid::new_v4(), "a@x.com").unwrap();

        // An access token is not a refresh token and vice versa: the secrets
        // differ, so cross-verification must fail.
        assert!(matches!(
            issuer.verify_refresh(&pair.access_token),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(
            issuer.verify_access(&pair.refresh_token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_verify_with_wrong_secret_fails() {
        let issuer = test_issuer();
        let other = TokenIssuer::new(
            "a-completely-different-access-secret!!",
            "a-completely-different-refresh-secret!",
            Duration::minutes(15),
            Duration::days(7),
        );

        let pair = issuer.issue_pair(Uuid::new_v4(), "a@x.com").unwrap();

        assert!(other.verify_access(&pair.access_token).is_err());
        assert!(other.verify_refresh(&pair.refresh_token).is_err());
    }

    #[test]
    fn test_verify_malformed_token_fails() {
        let issuer = test_issuer();

        assert!(matches!(
            issuer.verify_access("not-a-jwt"),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(issuer.verify_access(""), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_verify_tampered_token_fails() {
        let issuer = test_issuer();
        let pair = issuer.issue_pair(Uuid::new_v4(), "a@x.com").unwrap();

        // Flip a character in the payload segment
        let mut tampered: Vec<String> = pair
            .access_token
            .split('.')
            .map(|s| s.to_string())
            .collect();
        tampered[1] = format!("x{}", &tampered[1][1..]);
        let tampered = tampered.join(".");

        assert!(issuer.verify_access(&tampered).is_err());
    }

    #[test]
    fn test_verify_expired_token_fails() {
        // Lifetime far enough in the past to clear the default leeway
        let issuer = TokenIssuer::new(
            "access-secret-for-tests-32-bytes-min!!",
            "refresh-secret-for-tests-32-bytes-min!",
            Duration::seconds(-3600),
            Duration::seconds(-3600),
        );

        let pair = issuer.issue_pair(Uuid::new_v4(), "a@x.com").unwrap();

        assert!(matches!(
            issuer.verify_access(&pair.access_token),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(
            issuer.verify_refresh(&pair.refresh_token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_issued_tokens_are_distinct() {
        let issuer = test_issuer();
        let pair = issuer.issue_pair(Uuid::new_v4(), "a@x.com").unwrap();

        assert_ne!(pair.access_token, pair.refresh_token);
    }
}
