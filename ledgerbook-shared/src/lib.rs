//! # Ledgerbook Shared Library
//!
//! This crate contains the shared types and the auth/tenancy core used by
//! the ledgerbook API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Passwords, token issuance, authentication and authorization
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the ledgerbook shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
