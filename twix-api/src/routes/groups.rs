/// Group endpoints
///
/// A group is visible to its admin and its members. Renaming, deleting and
/// changing the member set are admin-only.
///
/// - `GET /v1/groups`
/// - `POST /v1/groups` - the caller becomes admin and first member
/// - `GET /v1/groups/:id`
/// - `PATCH /v1/groups/:id`
/// - `DELETE /v1/groups/:id` - unassigns every task pointing at the group
/// - `POST /v1/groups/:id/add_member` - `{"user_id": "..."}`
/// - `POST /v1/groups/:id/remove_member` - `{"user_id": "..."}`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    projections::{GroupDetail, GroupSummary},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use twix_shared::{
    auth::{
        policy::{enforce, Action},
        principal::Principal,
    },
    membership::{self, GroupWithMembers},
    models::group::Group,
};
use uuid::Uuid;
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/groups", get(list_groups).post(create_group))
        .route(
            "/v1/groups/:id",
            get(get_group).patch(update_group).delete(delete_group),
        )
        .route("/v1/groups/:id/add_member", post(add_member))
        .route("/v1/groups/:id/remove_member", post(remove_member))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GroupRequest {
    #[validate(length(min = 1, max = 255, message = "Name required"))]
    pub name: String,
}

/// Body of add_member / remove_member
#[derive(Debug, Default, Deserialize)]
pub struct MemberRequest {
    pub user_id: Option<Uuid>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Group not found".to_string())
}

async fn authorized_group(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    action: Action,
) -> ApiResult<Group> {
    let group = Group::find_scoped(&state.db, principal.user_id, id)
        .await?
        .ok_or_else(not_found)?;

    let relation = group.relation_of(&state.db, principal.user_id).await?;
    enforce(action, &relation)?;

    Ok(group)
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<GroupSummary>>> {
    let groups = Group::list_scoped(&state.db, principal.user_id).await?;
    Ok(Json(groups.into_iter().map(GroupSummary::from).collect()))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<GroupRequest>,
) -> ApiResult<(StatusCode, Json<GroupDetail>)> {
    req.validate()?;

    let group = Group::create(&state.db, req.name.trim(), principal.user_id).await?;

    tracing::info!(group_id = %group.id, admin_id = %principal.user_id, "Group created");

    let detail = GroupWithMembers::load(&state.db, group).await?;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

pub async fn get_group(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GroupDetail>> {
    let group = Group::find_scoped(&state.db, principal.user_id, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(GroupWithMembers::load(&state.db, group).await?.into()))
}

pub async fn update_group(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<GroupRequest>,
) -> ApiResult<Json<GroupDetail>> {
    req.validate()?;
    authorized_group(&state, &principal, id, Action::UpdateGroup).await?;

    let group = Group::rename(&state.db, id, req.name.trim())
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(GroupWithMembers::load(&state.db, group).await?.into()))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authorized_group(&state, &principal, id, Action::DeleteGroup).await?;

    if !Group::delete(&state.db, id).await? {
        return Err(not_found());
    }

    tracing::info!(group_id = %id, admin_id = %principal.user_id, "Group deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Adds a user to the group; adding an existing member is a no-op
///
/// # Errors
///
/// - `403 Forbidden`: caller is not the group admin
/// - `404 Not Found`: group out of scope, or no user with the given id
/// - `422 Unprocessable Entity`: `user_id` missing
pub async fn add_member(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    body: Option<Json<MemberRequest>>,
) -> ApiResult<Json<GroupDetail>> {
    let Json(req) = body.unwrap_or_default();
    let outcome = membership::add_member(&state.db, &principal, id, req.user_id).await?;
    Ok(Json(outcome.group.into()))
}

/// Removes a user from the group; removing a non-member is a no-op
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    body: Option<Json<MemberRequest>>,
) -> ApiResult<Json<GroupDetail>> {
    let Json(req) = body.unwrap_or_default();
    let outcome = membership::remove_member(&state.db, &principal, id, req.user_id).await?;
    Ok(Json(outcome.group.into()))
}
