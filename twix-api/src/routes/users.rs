/// Account endpoints
///
/// - `GET /v1/user` - the caller's account
/// - `PATCH /v1/user` - partial update of name, email or password
/// - `DELETE /v1/user` - delete the account and everything it owns
/// - `GET /v1/users?email=` - find users to add to a group

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    projections::{AccountView, UserSummary},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use twix_shared::{
    auth::{password, principal::Principal},
    models::user::{UpdateUser, User},
};
use validator::Validate;

/// Most results returned by a user search
pub const SEARCH_LIMIT: i64 = 20;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/user", get(me).patch(update_me).delete(delete_me))
        .route("/v1/users", get(search))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub email: Option<String>,
}

pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<AccountView>> {
    let user = User::find_by_id(&state.db, principal.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Json<AccountView>> {
    req.validate()?;

    let password_hash = match req.password.as_deref() {
        Some(new_password) => {
            password::validate_password_strength(new_password)
                .map_err(|message| ApiError::invalid("password", message))?;
            Some(password::hash_password(new_password)?)
        }
        None => None,
    };

    let user = User::update(
        &state.db,
        principal.user_id,
        UpdateUser {
            email: req.email,
            name: req.name,
            password_hash,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "Account updated");

    Ok(Json(user.into()))
}

pub async fn delete_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<StatusCode> {
    if !User::delete(&state.db, principal.user_id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %principal.user_id, "Account deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Users whose email contains the query, for picking group members
pub async fn search(
    State(state): State<AppState>,
    Extension(_principal): Extension<Principal>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let fragment = query
        .email
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| ApiError::invalid("email", "Email required"))?;

    let users = User::search_by_email(&state.db, &fragment, SEARCH_LIMIT).await?;

    Ok(Json(users.iter().map(UserSummary::from).collect()))
}
