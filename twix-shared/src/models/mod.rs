/// Database models for Twix
///
/// Each model is a `sqlx::FromRow` struct with its queries in an `impl`
/// block. Functions named `*_scoped` take the principal's id and only see
/// rows inside that principal's scope (see [`crate::scope`]).
///
/// # Models
///
/// - `user`: accounts, registration with a personal group
/// - `group`: groups, their admin and member set
/// - `board`: boards owned by a user
/// - `task`: tasks on a board, optionally shared with a group
/// - `assigned_task`: per-member copies of shared tasks
/// - `device`: push notification tokens

pub mod assigned_task;
pub mod board;
pub mod device;
pub mod group;
pub mod task;
pub mod user;
