/// The caller's copies of tasks assigned to their groups
///
/// Rows are created and removed by task saves; clients can only read them
/// and toggle their own completion flag.
///
/// - `GET /v1/assigned-tasks`
/// - `GET /v1/assigned-tasks/:id`
/// - `PATCH /v1/assigned-tasks/:id` - `{"is_done": true}`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    projections::AssignedTaskView,
};
use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use twix_shared::{
    auth::{
        policy::{enforce, Action},
        principal::Principal,
    },
    models::{assigned_task::AssignedTask, task::Task},
    scope::Relation,
};
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/assigned-tasks", get(list_assigned_tasks))
        .route(
            "/v1/assigned-tasks/:id",
            get(get_assigned_task).patch(update_assigned_task),
        )
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssignedTaskRequest {
    pub is_done: bool,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Assigned task not found".to_string())
}

async fn view(pool: &PgPool, row: AssignedTask) -> ApiResult<AssignedTaskView> {
    let task = Task::find_by_id(pool, row.task_id).await?;
    Ok(AssignedTaskView::new(row, task))
}

pub async fn list_assigned_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<AssignedTaskView>>> {
    let rows = AssignedTask::list_scoped(&state.db, principal.user_id).await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(view(&state.db, row).await?);
    }

    Ok(Json(views))
}

pub async fn get_assigned_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AssignedTaskView>> {
    let row = AssignedTask::find_for_assignee(&state.db, principal.user_id, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(view(&state.db, row).await?))
}

pub async fn update_assigned_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAssignedTaskRequest>,
) -> ApiResult<Json<AssignedTaskView>> {
    let row = AssignedTask::find_for_assignee(&state.db, principal.user_id, id)
        .await?
        .ok_or_else(not_found)?;
    enforce(
        Action::UpdateAssignedTask,
        &Relation {
            is_assignee: row.user_id == principal.user_id,
            ..Default::default()
        },
    )?;

    let row = AssignedTask::set_done(&state.db, principal.user_id, id, req.is_done)
        .await?
        .ok_or_else(not_found)?;

    tracing::debug!(assigned_task_id = %row.id, is_done = row.is_done, "Assigned task updated");

    Ok(Json(view(&state.db, row).await?))
}
