//! # Twix Shared Library
//!
//! Types, storage access and business rules shared by the Twix API server and
//! the reminder worker.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `db`: Connection pool and migrations
//! - `auth`: Passwords, tokens, principals and authorization policy
//! - `scope`: Visible-record predicates per principal and resource
//! - `assignment`: Task assignment reconciliation and fan-out
//! - `membership`: Group member administration
//! - `notify`: Push notification dispatch

pub mod assignment;
pub mod auth;
pub mod db;
pub mod membership;
pub mod models;
pub mod notify;
pub mod scope;

/// Current version of the Twix shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
