//! Centralized error handling for the Pledg backend
//!
//! `LendingError` is the typed failure taxonomy of the lending core; it is
//! returned by the pure LTV math and the loan lifecycle operations.
//! `ApiError` wraps it (and infrastructure failures) for the HTTP layer with
//! proper status code mapping and JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Domain failures of the lending core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LendingError {
    /// Non-positive price or amount passed to pure math
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Loan application attempted without KYC/bank prerequisites
    #[error("Not eligible: {0}")]
    Eligibility(String),

    /// Repayment amount non-positive or exceeding outstanding principal
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Status change attempted from an unexpected source state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Referenced loan or account does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log server errors
        match &self {
            ApiError::InternalError(_) => {
                tracing::error!(error = %message, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversions from common error types

impl From<LendingError> for ApiError {
    fn from(err: LendingError) -> Self {
        match err {
            LendingError::InvalidInput(m) => ApiError::BadRequest(m),
            LendingError::Eligibility(m) => ApiError::Forbidden(m),
            LendingError::InvalidAmount(m) => ApiError::UnprocessableEntity(m),
            LendingError::InvalidTransition(m) => ApiError::Conflict(m),
            LendingError::NotFound(m) => ApiError::NotFound(m),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", err))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            ApiError::BadRequest("test".to_string()).error_code(),
            "BAD_REQUEST"
        );
        assert_eq!(
            ApiError::Conflict("test".to_string()).error_code(),
            "CONFLICT"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::UnprocessableEntity("test".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::InternalError("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_lending_error_mapping() {
        let api: ApiError = LendingError::InvalidAmount("too large".to_string()).into();
        assert_eq!(api.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let api: ApiError = LendingError::Eligibility("kyc missing".to_string()).into();
        assert_eq!(api.status_code(), StatusCode::FORBIDDEN);

        let api: ApiError = LendingError::InvalidTransition("already active".to_string()).into();
        assert_eq!(api.status_code(), StatusCode::CONFLICT);
    }
}
