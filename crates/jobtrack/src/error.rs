use crate::board::{BoardServiceError, RepositoryError};
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Board(BoardServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Board(err) => write!(f, "board error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Board(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Board(BoardServiceError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Board(BoardServiceError::Unauthorized) => StatusCode::FORBIDDEN,
            AppError::Board(
                BoardServiceError::BoardNotFound
                | BoardServiceError::ColumnNotFound
                | BoardServiceError::JobApplicationNotFound
                | BoardServiceError::Repository(RepositoryError::NotFound),
            ) => StatusCode::NOT_FOUND,
            AppError::Board(BoardServiceError::Repository(RepositoryError::Conflict)) => {
                StatusCode::CONFLICT
            }
            AppError::Board(BoardServiceError::Repository(RepositoryError::Unavailable(_)))
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Board(err) => err.to_string(),
            other => other.to_string(),
        };
        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<BoardServiceError> for AppError {
    fn from(value: BoardServiceError) -> Self {
        Self::Board(value)
    }
}
