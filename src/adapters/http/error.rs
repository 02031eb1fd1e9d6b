//! Error-to-HTTP response conversion.

use crate::domain::error::RestreamError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so handlers can return `Result<T, AppError>` and use `?` on service calls.
#[derive(Debug)]
pub struct AppError(pub RestreamError);

impl From<RestreamError> for AppError {
    fn from(e: RestreamError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "request failed");
        } else {
            tracing::debug!(status = %status, error = %self.0, "request rejected");
        }

        let body = json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::playlist::ParseError;

    #[test]
    fn validation_produces_400() {
        let response = AppError(RestreamError::Validation("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parse_produces_500() {
        let response =
            AppError(RestreamError::Parse(ParseError::MissingUrl { line: 1 })).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
