/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Session lifecycle (register, login, refresh, logout)
/// - `users`: Profile endpoints
/// - `organizations`: Organization management
/// - `members`: Organization member management

pub mod auth;
pub mod health;
pub mod members;
pub mod organizations;
pub mod users;
