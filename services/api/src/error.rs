//! HTTP mapping of service errors
//!
//! Only the error kind and a short message reach the client. Datastore and
//! internal failures are logged and reported as a generic 500.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Error reported by a service component
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Malformed request parameter
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// Status code and client-facing message
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Core(err) => match err {
                CoreError::Unauthorized | CoreError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, err.to_string())
                }
                CoreError::DuplicateUsername
                | CoreError::AlreadyFriends
                | CoreError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                CoreError::Forbidden => (StatusCode::FORBIDDEN, err.to_string()),
                CoreError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                CoreError::Internal(_) | CoreError::Database(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

// Extractor rejections carry deserializer detail; only a short message is
// returned to the client.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest("Invalid request body".to_string())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!("Rejected path parameter: {}", rejection.body_text());
        ApiError::BadRequest("Invalid path parameter".to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!("Rejected query string: {}", rejection.body_text());
        ApiError::BadRequest("Invalid query string".to_string())
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
