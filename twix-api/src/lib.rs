//! # Twix API Server Library
//!
//! HTTP surface of Twix: boards, tasks, groups and the per-member copies of
//! assigned tasks.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `projections`: Response shapes
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod projections;
pub mod routes;
