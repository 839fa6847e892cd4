//! API error responses.
//!
//! Every failure is rendered as `{"error": ..., "details": ...}`. Validation
//! failures are the caller's fault (400); everything else is ours or the
//! warehouse's (500).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shelfsight_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be decoded.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Core(CoreError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn details(&self) -> Option<String> {
        match self {
            Self::BadRequest(_) => None,
            Self::Core(error) => error.details(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %body.error, "request failed");
        } else {
            tracing::warn!(status = %status, error = %body.error, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shelfsight_core::{ConfigurationError, ValidationError};

    #[test]
    fn validation_errors_are_client_errors() {
        let error = ApiError::from(CoreError::from(ValidationError::EmptyQuery));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.details(), None);
    }

    #[test]
    fn configuration_errors_are_server_errors_with_details() {
        let error = ApiError::from(CoreError::from(ConfigurationError::Missing {
            missing: vec![String::from("DATABRICKS_TOKEN")],
        }));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.details().as_deref(), Some("DATABRICKS_TOKEN"));
    }
}
