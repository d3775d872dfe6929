use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ColumnId, JobApplicationId, JobApplicationUpdate, NewJobApplication, UserId};
use super::repository::BoardRepository;
use super::service::{BoardServiceError, JobBoardService};
use crate::error::AppError;

/// Header carrying the caller id resolved by the upstream auth provider.
pub const USER_HEADER: &str = "x-user-id";

/// Body of a drag-and-drop move.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveRequest {
    pub column_id: ColumnId,
    #[serde(default)]
    pub index: Option<usize>,
}

/// Router builder exposing the board endpoints.
pub fn board_router<R>(service: Arc<JobBoardService<R>>) -> Router
where
    R: BoardRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/board",
            post(init_board_handler::<R>).get(board_handler::<R>),
        )
        .route(
            "/api/v1/board/applications",
            post(create_handler::<R>),
        )
        .route(
            "/api/v1/board/applications/:application_id",
            patch(update_handler::<R>).delete(delete_handler::<R>),
        )
        .route(
            "/api/v1/board/applications/:application_id/move",
            post(move_handler::<R>),
        )
        .with_state(service)
}

fn current_user(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(UserId::new)
        .ok_or_else(|| {
            let payload = json!({ "error": "authentication required" });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        })
}

fn error_response(error: BoardServiceError) -> Response {
    AppError::from(error).into_response()
}

pub(crate) async fn init_board_handler<R>(
    State(service): State<Arc<JobBoardService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: BoardRepository + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let seeded = service
        .init_user_board(&user)
        .and_then(|_| service.get_user_board(&user));
    match seeded {
        Ok(Some(view)) => (StatusCode::OK, axum::Json(view)).into_response(),
        Ok(None) => error_response(BoardServiceError::BoardNotFound),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn board_handler<R>(
    State(service): State<Arc<JobBoardService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: BoardRepository + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match service.get_user_board(&user) {
        Ok(Some(view)) => (StatusCode::OK, axum::Json(view)).into_response(),
        Ok(None) => error_response(BoardServiceError::BoardNotFound),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<JobBoardService<R>>>,
    headers: HeaderMap,
    axum::Json(data): axum::Json<NewJobApplication>,
) -> Response
where
    R: BoardRepository + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match service.create_job_application(&user, data) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<JobBoardService<R>>>,
    Path(application_id): Path<JobApplicationId>,
    headers: HeaderMap,
    axum::Json(updates): axum::Json<JobApplicationUpdate>,
) -> Response
where
    R: BoardRepository + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match service.update_job_application(&user, application_id, updates) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn move_handler<R>(
    State(service): State<Arc<JobBoardService<R>>>,
    Path(application_id): Path<JobApplicationId>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<MoveRequest>,
) -> Response
where
    R: BoardRepository + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match service.move_job_application(&user, application_id, request.column_id, request.index) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<JobBoardService<R>>>,
    Path(application_id): Path<JobApplicationId>,
    headers: HeaderMap,
) -> Response
where
    R: BoardRepository + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match service.delete_job_application(&user, application_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}
