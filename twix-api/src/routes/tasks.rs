/// Task endpoints
///
/// Creates and updates go through the [`AssignmentEngine`](twix_shared::assignment::AssignmentEngine)
/// so the per-member copies of an assigned task are reconciled in the same
/// transaction as the save.
///
/// - `GET /v1/tasks?board_id=`
/// - `POST /v1/tasks`
/// - `GET /v1/tasks/:id`
/// - `PATCH /v1/tasks/:id` - partial; `null` clears a nullable field
/// - `DELETE /v1/tasks/:id`

use super::nullable;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    projections::TaskView,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use twix_shared::{
    auth::{
        policy::{enforce, Action},
        principal::Principal,
    },
    models::{
        board::Board,
        task::{CreateTask, Task, UpdateTask},
    },
    scope::Relation,
};
use uuid::Uuid;
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tasks", get(list_tasks).post(create_task))
        .route(
            "/v1/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub board_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Name required"))]
    pub name: String,

    pub board_id: Uuid,

    #[serde(default)]
    pub is_done: bool,

    pub due_date: Option<NaiveDate>,
    pub reminder: Option<DateTime<Utc>>,
    pub notes: Option<String>,

    #[serde(default)]
    pub is_assigned: bool,

    pub group_id: Option<Uuid>,
}

impl From<CreateTaskRequest> for CreateTask {
    fn from(req: CreateTaskRequest) -> Self {
        CreateTask {
            name: req.name,
            board_id: req.board_id,
            is_done: req.is_done,
            due_date: req.due_date,
            reminder: req.reminder,
            notes: req.notes,
            is_assigned: req.is_assigned,
            group_id: req.group_id,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Name required"))]
    pub name: Option<String>,

    pub is_done: Option<bool>,

    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "nullable")]
    pub reminder: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,

    pub is_assigned: Option<bool>,

    #[serde(default, deserialize_with = "nullable")]
    pub group_id: Option<Option<Uuid>>,

    /// Moves the task to another of the caller's boards
    pub board_id: Option<Uuid>,
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            name: req.name,
            is_done: req.is_done,
            due_date: req.due_date,
            reminder: req.reminder,
            notes: req.notes,
            is_assigned: req.is_assigned,
            group_id: req.group_id,
            board_id: req.board_id,
        }
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let tasks = Task::list_scoped(&state.db, principal.user_id, query.board_id).await?;
    Ok(Json(tasks.into_iter().map(TaskView::from).collect()))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskView>> {
    let task = Task::find_scoped(&state.db, principal.user_id, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(task.into()))
}

/// Creates a task; an assigned task fans out to every member of its group
///
/// # Errors
///
/// - `404 Not Found`: board or group outside the caller's scope
/// - `409 Conflict`: `is_assigned` without a `group_id`
/// - `422 Unprocessable Entity`: validation failed
pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    req.validate()?;

    let saved = state
        .engine
        .create_task(&state.db, &principal, req.into())
        .await?;

    if saved.dispatch.failed() > 0 {
        tracing::warn!(
            task_id = %saved.task.id,
            failed = saved.dispatch.failed(),
            "Some assignment notifications were not delivered"
        );
    }

    Ok((StatusCode::CREATED, Json(saved.task.into())))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskView>> {
    req.validate()?;

    let saved = state
        .engine
        .update_task(&state.db, &principal, id, req.into())
        .await?;

    Ok(Json(saved.task.into()))
}

/// Deletes a task; its per-member copies go with it
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let task = Task::find_scoped(&state.db, principal.user_id, id)
        .await?
        .ok_or_else(not_found)?;
    let board = Board::find_scoped(&state.db, principal.user_id, task.board_id)
        .await?
        .ok_or_else(not_found)?;
    enforce(
        Action::DeleteTask,
        &Relation {
            is_owner: board.owner_id == principal.user_id,
            ..Default::default()
        },
    )?;

    if !Task::delete_scoped(&state.db, principal.user_id, id).await? {
        return Err(not_found());
    }

    tracing::info!(task_id = %id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"is_assigned": false, "group_id": null}"#).unwrap();
        let changes = UpdateTask::from(req);

        assert_eq!(changes.is_assigned, Some(false));
        assert_eq!(changes.group_id, Some(None));
        assert_eq!(changes.notes, None);
        assert_eq!(changes.name, None);
    }

    #[test]
    fn test_create_request_defaults() {
        let board_id = Uuid::new_v4();
        let req: CreateTaskRequest =
            serde_json::from_str(&format!(r#"{{"name": "Ship", "board_id": "{}"}}"#, board_id))
                .unwrap();
        let data = CreateTask::from(req);

        assert!(!data.is_done);
        assert!(!data.is_assigned);
        assert_eq!(data.group_id, None);
        assert_eq!(data.board_id, board_id);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let req = UpdateTaskRequest {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}
