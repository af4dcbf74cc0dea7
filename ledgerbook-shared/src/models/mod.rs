/// Database models for ledgerbook
///
/// # Models
///
/// - `user`: User accounts and credentials
/// - `organization`: Organizations, the tenant boundary
/// - `membership`: User-organization relationships with roles
/// - `refresh_token`: Stored refresh tokens (one row per live token)

pub mod membership;
pub mod organization;
pub mod refresh_token;
pub mod user;
