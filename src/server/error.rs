//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any
//! [`anilib_common::Error`] converts with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(pub anilib_common::Error);

impl From<anilib_common::Error> for AppError {
    fn from(e: anilib_common::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Server error in API handler");
        }

        let code = match &self.0 {
            anilib_common::Error::NotFound { .. } => "not_found",
            anilib_common::Error::AlreadyExists { .. } => "already_exists",
            anilib_common::Error::Conflict(_) => "conflict",
            anilib_common::Error::InvalidInput(_) => "invalid_input",
            anilib_common::Error::Lookup { .. } => "lookup_error",
            anilib_common::Error::ProviderUnavailable(_) => "provider_unavailable",
            anilib_common::Error::ToolUnavailable(_) => "tool_unavailable",
            anilib_common::Error::Probe(_) => "probe_error",
            anilib_common::Error::Tool { .. } => "tool_error",
            anilib_common::Error::Store { .. } => "store_error",
            anilib_common::Error::Io { .. } => "io_error",
            anilib_common::Error::Cancelled => "cancelled",
            anilib_common::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.0.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Handler result type.
pub type ApiResult<T> = std::result::Result<T, AppError>;
