/// Middleware modules for the API server
///
/// - `rate_limit`: In-memory token buckets for the session endpoints
/// - `security`: Security response headers

pub mod rate_limit;
pub mod security;
