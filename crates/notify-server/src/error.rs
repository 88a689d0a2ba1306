use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notify_sync::SyncError;
use notify_types::TypeError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or malformed request body.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("access denied for {0}")]
    Forbidden(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TypeError> for ServerError {
    fn from(e: TypeError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Sync(SyncError::UnknownBucket(_) | SyncError::Identity(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Sync(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
