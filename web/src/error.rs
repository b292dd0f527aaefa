//! HTTP error responses.
//!
//! [`AppError`] carries a status, a stable machine code, and a user-facing
//! message. Domain errors convert into it via `From<AttendanceError>`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gathering_core::{AttendanceError, ForbiddenReason};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```
/// use axum::http::StatusCode;
/// use gathering_core::{AttendanceError, ForbiddenReason};
/// use gathering_web::AppError;
///
/// let err = AppError::from(AttendanceError::forbidden(ForbiddenReason::EventEnded));
/// assert_eq!(err.status(), StatusCode::FORBIDDEN);
/// assert_eq!(err.code(), "EVENT_ENDED");
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Structured detail for the client, such as a pending join request id
    details: Option<serde_json::Value>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            details: None,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach structured details to the response body.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "INVALID_ARGUMENT")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// Create a 403 Forbidden error for a missing role.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message, "FORBIDDEN")
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<AttendanceError> for AppError {
    fn from(err: AttendanceError) -> Self {
        let code = err.code();
        match err {
            AttendanceError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, err.to_string(), code)
            }
            AttendanceError::InvalidArgument(message) => {
                Self::new(StatusCode::BAD_REQUEST, message, code)
            }
            AttendanceError::Forbidden { reason } => {
                let forbidden = Self::new(StatusCode::FORBIDDEN, reason.to_string(), code);
                match reason {
                    ForbiddenReason::JoinRequestPending { request_id } => forbidden
                        .with_details(serde_json::json!({ "join_request_id": request_id })),
                    ForbiddenReason::CapacityBelowAttendance { requested, attending } => forbidden
                        .with_details(serde_json::json!({
                            "requested": requested,
                            "attending": attending,
                        })),
                    _ => forbidden,
                }
            }
            AttendanceError::Conflict(_) => Self::new(
                StatusCode::CONFLICT,
                "The event is busy, please retry",
                code,
            )
            .with_source(err.into()),
            AttendanceError::DatabaseError(_) | AttendanceError::Internal(_) => {
                Self::internal("An internal error occurred").with_source(err.into())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: &'static str,
    /// Human-readable error message.
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                error = self.source.as_ref().map(tracing::field::display),
                "Internal server error"
            );
        } else if let Some(source) = &self.source {
            tracing::warn!(
                status = %self.status,
                code = self.code,
                error = %source,
                "Request failed"
            );
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };

        (self.status, Json(body)).into_response()
    }
}
