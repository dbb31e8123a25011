/// Unified error types for the DevHarbor backend
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed or invalid input
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or token; messages stay generic so callers cannot
    /// distinguish unknown users from wrong passwords
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity absent
    #[error("{0}")]
    NotFound(String),

    /// Unique-constraint conflicts
    #[error("{0}")]
    Conflict(String),

    /// Suspension denial carrying the structured payload the front-end
    /// routes on
    #[error("Account is suspended")]
    Suspended {
        account_disabled: bool,
        user_disabled: bool,
    },

    /// Dedicated signin URL does not resolve
    #[error("Invalid signin URL")]
    InvalidSigninUrl,

    /// Dedicated signin URL resolves to a disabled account
    #[error("Account is disabled")]
    AccountDisabled,

    /// Dedicated signin URL resolves to a disabled user
    #[error("User is disabled")]
    UserDisabled,

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            // The suspension payload carries extra routing flags
            ApiError::Suspended {
                account_disabled,
                user_disabled,
            } => {
                let body = Json(json!({
                    "error": "account_suspended",
                    "message": "Your account has been suspended. Please contact support for assistance.",
                    "account_suspended": true,
                    "account_disabled": account_disabled,
                    "user_disabled": user_disabled,
                }));
                return (StatusCode::FORBIDDEN, body).into_response();
            }
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request", self.to_string()),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict", self.to_string()),
            ApiError::InvalidSigninUrl => (
                StatusCode::NOT_FOUND,
                "invalid_signin_url",
                self.to_string(),
            ),
            ApiError::AccountDisabled => (
                StatusCode::FORBIDDEN,
                "account_disabled",
                self.to_string(),
            ),
            ApiError::UserDisabled => (StatusCode::FORBIDDEN, "user_disabled", self.to_string()),
            ApiError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                "Rate limit exceeded".to_string(),
            ),
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorBody {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type ApiResult<T> = Result<T, ApiError>;
