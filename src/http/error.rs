use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::debates::DebateError;
use crate::issues::IssueError;
use crate::proxy::ProxyError;
use crate::store::StoreError;

const SOURCE_FETCH_FAILED: &str = "Failed to fetch source page";
const PDF_FETCH_FAILED: &str = "Failed to fetch remote PDF";
const STORAGE_FAILED: &str = "Object storage request failed";

/// Error rendered as `{"error": "<message>"}` with a mapped status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(source: &dyn std::fmt::Display) -> Self {
        error!(error = %source, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    /// Logs `source` and answers 502 with the fixed `message`. Upstream
    /// error text carries URLs and storage responses, so it never reaches
    /// the client.
    fn bad_gateway(message: &'static str, source: &dyn std::fmt::Display) -> Self {
        warn!(error = %source, "{message}");
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<DebateError> for ApiError {
    fn from(err: DebateError) -> Self {
        match err {
            DebateError::MissingId | DebateError::InvalidId(_) | DebateError::InvalidUpload(_) => {
                Self::bad_request(err.to_string())
            }
            DebateError::NotFound(_) => Self::not_found("Debate not found"),
            DebateError::Upstream { .. } | DebateError::Fetch(_) => {
                Self::bad_gateway(SOURCE_FETCH_FAILED, &err)
            }
            DebateError::Storage(_) => Self::bad_gateway(STORAGE_FAILED, &err),
            DebateError::Persistence(_) => Self::internal(&err),
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::MissingUrl => Self::bad_request(err.to_string()),
            ProxyError::Forbidden { .. } | ProxyError::InvalidTarget(_) => {
                Self::forbidden(err.to_string())
            }
            ProxyError::Upstream { .. } | ProxyError::Fetch(_) => {
                Self::bad_gateway(PDF_FETCH_FAILED, &err)
            }
        }
    }
}

impl From<IssueError> for ApiError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::Invalid(_) => Self::bad_request(err.to_string()),
            IssueError::NotFound(_) => Self::not_found(err.to_string()),
            IssueError::Storage(_) => Self::bad_gateway(STORAGE_FAILED, &err),
            IssueError::Persistence(store) => Self::from(store),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => Self::new(StatusCode::CONFLICT, err.to_string()),
            StoreError::Database { .. } => Self::internal(&err),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), format!("Malformed multipart body: {}", err.body_text()))
    }
}
