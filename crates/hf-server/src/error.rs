//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any [`hf_core::Error`]
//! converts with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(pub hf_core::Error);

impl From<hf_core::Error> for AppError {
    fn from(e: hf_core::Error) -> Self {
        Self(e)
    }
}

impl AppError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match &self.0 {
            hf_core::Error::NotFound { .. } => "not_found",
            hf_core::Error::Validation(_) => "validation_error",
            hf_core::Error::InvalidExtension { .. } => "invalid_extension",
            hf_core::Error::EmptySelection => "empty_selection",
            hf_core::Error::Io { .. } => "io_error",
            hf_core::Error::Tool { .. } => "tool_error",
            hf_core::Error::Conversion { .. } => "conversion_error",
            hf_core::Error::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.0,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.0.to_string(),
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
