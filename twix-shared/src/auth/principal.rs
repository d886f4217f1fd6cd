/// Request principal
///
/// Turns an `Authorization: Bearer <token>` header into a [`Principal`]: the
/// token must be a valid access token and its subject must still be an
/// active account. Everything downstream of authentication works with the
/// principal only.
///
/// # Example
///
/// ```no_run
/// use twix_shared::auth::principal::authenticate;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let principal = authenticate(&pool, "jwt-secret", Some("Bearer eyJ...")).await?;
/// println!("request made by {}", principal.user_id);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::user::User;

/// The authenticated identity making a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub is_staff: bool,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            is_staff: user.is_staff,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Expected Bearer token")]
    InvalidFormat,

    #[error(transparent)]
    InvalidToken(#[from] JwtError),

    /// Token is fine but the account is gone or deactivated
    #[error("User inactive or deleted")]
    InactiveUser,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Extracts the token from an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

pub async fn authenticate(
    pool: &PgPool,
    secret: &str,
    header: Option<&str>,
) -> Result<Principal, AuthError> {
    let claims = validate_access_token(bearer_token(header)?, secret)?;

    match User::find_by_id(pool, claims.sub).await? {
        Some(user) if user.is_active => Ok(Principal::from_user(&user)),
        _ => Err(AuthError::InactiveUser),
    }
}
