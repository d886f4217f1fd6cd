/// API route handlers
///
/// Each resource module exposes a `routes()` table that
/// [`crate::app::build_router`] merges at startup:
///
/// - `health`: health check
/// - `auth`: register, login, token refresh
/// - `users`: the caller's account and user lookup
/// - `devices`: push notification targets
/// - `boards`, `tasks`, `groups`, `assigned_tasks`: the task board itself

pub mod assigned_tasks;
pub mod auth;
pub mod boards;
pub mod devices;
pub mod groups;
pub mod health;
pub mod tasks;
pub mod users;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
///
/// Use together with `#[serde(default)]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
