/// Board endpoints
///
/// Boards are visible to their owner only. Anything outside that scope
/// answers `404`, never `403`.
///
/// - `GET /v1/boards`
/// - `POST /v1/boards`
/// - `GET /v1/boards/:id` - with its tasks
/// - `PATCH /v1/boards/:id`
/// - `DELETE /v1/boards/:id` - deletes its tasks too

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    projections::{BoardDetail, BoardSummary},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use twix_shared::{
    auth::{
        policy::{enforce, Action},
        principal::Principal,
    },
    models::{
        board::{Board, CreateBoard, UpdateBoard},
        task::Task,
    },
    scope::Relation,
};
use uuid::Uuid;
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/boards", get(list_boards).post(create_board))
        .route(
            "/v1/boards/:id",
            get(get_board).patch(update_board).delete(delete_board),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    #[validate(length(min = 1, max = 255, message = "Name required"))]
    pub name: String,

    #[serde(default)]
    pub is_personal: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    #[validate(length(min = 1, max = 255, message = "Name required"))]
    pub name: Option<String>,

    pub is_personal: Option<bool>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Board not found".to_string())
}

/// Loads a board in scope and checks `action` against it
async fn authorized_board(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    action: Action,
) -> ApiResult<Board> {
    let board = Board::find_scoped(&state.db, principal.user_id, id)
        .await?
        .ok_or_else(not_found)?;

    let relation = Relation {
        is_owner: board.owner_id == principal.user_id,
        ..Default::default()
    };
    enforce(action, &relation)?;

    Ok(board)
}

pub async fn list_boards(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<BoardSummary>>> {
    let boards = Board::list_scoped(&state.db, principal.user_id).await?;
    Ok(Json(boards.into_iter().map(BoardSummary::from).collect()))
}

pub async fn create_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<BoardDetail>)> {
    req.validate()?;

    let board = Board::create(
        &state.db,
        principal.user_id,
        CreateBoard {
            name: req.name,
            is_personal: req.is_personal,
        },
    )
    .await?;

    tracing::info!(board_id = %board.id, owner_id = %principal.user_id, "Board created");

    Ok((StatusCode::CREATED, Json(BoardDetail::new(board, Vec::new()))))
}

pub async fn get_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BoardDetail>> {
    let board = Board::find_scoped(&state.db, principal.user_id, id)
        .await?
        .ok_or_else(not_found)?;
    let tasks = Task::list_scoped(&state.db, principal.user_id, Some(board.id)).await?;

    Ok(Json(BoardDetail::new(board, tasks)))
}

pub async fn update_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBoardRequest>,
) -> ApiResult<Json<BoardDetail>> {
    req.validate()?;
    authorized_board(&state, &principal, id, Action::UpdateBoard).await?;

    let board = Board::update_scoped(
        &state.db,
        principal.user_id,
        id,
        UpdateBoard {
            name: req.name,
            is_personal: req.is_personal,
        },
    )
    .await?
    .ok_or_else(not_found)?;
    let tasks = Task::list_scoped(&state.db, principal.user_id, Some(board.id)).await?;

    Ok(Json(BoardDetail::new(board, tasks)))
}

pub async fn delete_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authorized_board(&state, &principal, id, Action::DeleteBoard).await?;

    if !Board::delete_scoped(&state.db, principal.user_id, id).await? {
        return Err(not_found());
    }

    tracing::info!(board_id = %id, "Board deleted");

    Ok(StatusCode::NO_CONTENT)
}
