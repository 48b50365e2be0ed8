//! API error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::LecternError;

use super::types::ErrorResponse;

/// An error rendered as a JSON [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    /// 400 with the bare validation message.
    pub fn validation(error: LecternError) -> Self {
        let error = match error {
            LecternError::Validation { message, .. } => message,
            other => other.to_string(),
        };
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse { error, details: None },
        }
    }

    /// 500 `{ "error": "OCR failed", "details": ... }`.
    pub fn ocr_failed(error: LecternError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                error: "OCR failed".to_string(),
                details: Some(error.to_string()),
            },
        }
    }

    /// 500 with the error message.
    pub fn internal(error: LecternError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                error: error.to_string(),
                details: None,
            },
        }
    }
}

impl From<LecternError> for ApiError {
    fn from(error: LecternError) -> Self {
        match error {
            LecternError::Validation { .. } => Self::validation(error),
            _ => Self::internal(error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.body.error, details = ?self.body.details, "Request failed");
        }
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_bad_request() {
        let err = ApiError::from(LecternError::validation("missing image"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.error, "missing image");
    }

    #[test]
    fn test_ocr_failed_shape() {
        let err = ApiError::ocr_failed(LecternError::gateway("quota exceeded"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.error, "OCR failed");
        assert_eq!(err.body.details.as_deref(), Some("OCR gateway error: quota exceeded"));
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err = ApiError::from(LecternError::Other("boom".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
