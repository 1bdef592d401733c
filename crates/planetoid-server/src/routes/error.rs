//! JSON error responses for the REST handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use planetoid_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Error returned by a REST handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The blocking store task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::InvalidName) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
            Self::Store(StoreError::GameNotFound(_) | StoreError::PlayerNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Store(_) | Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(StoreError::InvalidName) => "invalid_name",
            Self::Store(StoreError::AlreadyExists(_)) => "already_exists",
            Self::Store(StoreError::GameNotFound(_)) => "game_not_found",
            Self::Store(StoreError::PlayerNotFound(_)) => "player_not_found",
            Self::Store(_) | Self::Join(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
