/// Authentication endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new pair

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    projections::AccountView,
};
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use twix_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User},
};
use uuid::Uuid;
use validator::Validate;

/// Header carrying the client app token when registration is restricted
pub const APP_TOKEN_HEADER: &str = "x-app-token";

const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/refresh", post(refresh))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "Email required"),
        email(message = "Invalid email format")
    )]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: AccountView,

    /// The group created alongside the account
    pub personal_group_id: Uuid,

    #[serde(flatten)]
    pub tokens: jwt::TokenPair,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(required(message = "Email required"))]
    pub email: Option<String>,

    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user_id: Uuid,

    #[serde(flatten)]
    pub tokens: jwt::TokenPair,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Rejects the request unless it carries the configured app token
fn check_app_token(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = state.config.registration.app_token.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(APP_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided == Some(expected) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("Invalid app token".to_string()))
    }
}

/// Register a new user
///
/// Creates the account and its personal group in one transaction, then
/// returns a token pair.
///
/// # Errors
///
/// - `401 Unauthorized`: app token missing or wrong
/// - `409 Conflict`: email already exists
/// - `422 Unprocessable Entity`: validation failed
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    check_app_token(&state, &headers)?;
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|message| ApiError::invalid("password", message))?;
    let password_hash = password::hash_password(&req.password)?;

    let email = req
        .email
        .ok_or_else(|| ApiError::invalid("email", "Email required"))?;

    let (user, personal) = User::register(
        &state.db,
        CreateUser {
            email,
            name: req.name.trim().to_string(),
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, group_id = %personal.id, "User registered");

    let tokens = jwt::issue_pair(user.id, state.jwt_secret())?;

    Ok(Json(RegisterResponse {
        user: user.into(),
        personal_group_id: personal.id,
        tokens,
    }))
}

/// Login with email and password
///
/// Unknown email, wrong password and deactivated accounts all get the same
/// `401` so callers cannot probe for accounts.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;
    let email = req.email.unwrap_or_default();

    let user = User::find_by_email(&state.db, &email)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    Ok(Json(TokenResponse {
        user_id: user.id,
        tokens: jwt::issue_pair(user.id, state.jwt_secret())?,
    }))
}

/// Exchanges a refresh token for a fresh pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized("User inactive or deleted".to_string()))?;

    Ok(Json(TokenResponse {
        user_id: user.id,
        tokens: jwt::issue_pair(user.id, state.jwt_secret())?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_requires_email() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"password": "correct-horse-1"}"#).unwrap();
        let errors = req.validate().unwrap_err();

        match ApiError::from(errors) {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "email");
                assert_eq!(details[0].message, "Email required");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_register_rejects_malformed_email() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email": "not-an-email", "password": "correct-horse-1"}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_accepts_valid_payload() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email": "ada@example.com", "password": "correct-horse-1", "name": "Ada"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
    }
}
