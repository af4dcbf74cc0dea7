/// Authentication and authorization for ledgerbook
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`tokens`]: Access/refresh token issuance and verification
/// - [`middleware`]: Bearer-token authentication for inbound requests
/// - [`authorization`]: Organization membership resolution and the role gate
///
/// # Security Properties
///
/// - Passwords hashed with Argon2id (64 MiB memory, 3 iterations); the
///   library's verification is constant-time.
/// - Access and refresh tokens are signed with separate secrets; a token of
///   one kind never verifies as the other.
/// - Every verification failure (malformed, tampered, expired) collapses
///   into one error so callers surface a uniform 401.

pub mod authorization;
pub mod middleware;
pub mod password;
pub mod tokens;
