//! Error types for Textspace services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for each failure category of a function call
//! - HTTP status code mapping
//! - Envelope-shaped error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::WorkspaceTokenMap;
use crate::rpc::Envelope;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request errors (1xxx)
    MissingField,
    InvalidInput,

    // Authentication errors (2xxx)
    Unauthenticated,
    InvalidWorkspaceToken,
    WorkspaceTokenExpired,

    // Authorization errors (3xxx)
    PermissionDenied,

    // Resource errors (4xxx)
    NotFound,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,

    // External service errors (8xxx)
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::MissingField => 1001,
            ErrorCode::InvalidInput => 1002,

            ErrorCode::Unauthenticated => 2001,
            ErrorCode::InvalidWorkspaceToken => 2002,
            ErrorCode::WorkspaceTokenExpired => 2003,

            ErrorCode::PermissionDenied => 3001,

            ErrorCode::NotFound => 4001,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,

            ErrorCode::UpstreamError => 8001,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Request errors
    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    #[error("{field} cannot exceed {max} characters")]
    InputTooLong { field: String, max: usize },

    // Authentication errors
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    #[error("Invalid workspace token: {message}")]
    InvalidWorkspaceToken { message: String },

    #[error("Workspace token expired")]
    WorkspaceTokenExpired,

    // Authorization errors
    #[error("Permission denied: role {actual} cannot perform an action that requires {required}")]
    PermissionDenied { required: String, actual: String },

    // Resource errors
    #[error("{resource_type} not found: {id}")]
    NotFound { resource_type: String, id: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Failure reported by a remote gateway inside an error envelope
    #[error("{message}")]
    Remote { code: ErrorCode, message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a missing record
    pub fn not_found(resource_type: &str, id: impl ToString) -> Self {
        AppError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidInput { .. } | AppError::InputTooLong { .. } => ErrorCode::InvalidInput,
            AppError::Unauthenticated { .. } => ErrorCode::Unauthenticated,
            AppError::InvalidWorkspaceToken { .. } => ErrorCode::InvalidWorkspaceToken,
            AppError::WorkspaceTokenExpired => ErrorCode::WorkspaceTokenExpired,
            AppError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::DatabaseConnection { .. } => ErrorCode::DatabaseError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Remote { code, .. } => *code,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::MissingField { .. }
            | AppError::InvalidInput { .. }
            | AppError::InputTooLong { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthenticated { .. }
            | AppError::InvalidWorkspaceToken { .. }
            | AppError::WorkspaceTokenExpired => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::PermissionDenied { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::HttpClient(_) | AppError::Remote { .. } => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Render this error as an envelope, optionally carrying workspace tokens
    pub fn into_envelope_response(self, workspace_tokens: Option<WorkspaceTokenMap>) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        // Server-side detail stays in the log
        let message = match code {
            _ if !self.is_server_error() => message,
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable".to_string(),
            ErrorCode::UpstreamError => "Upstream service error".to_string(),
            _ => "Internal server error".to_string(),
        };

        let body = Envelope::<()>::failure(ErrorDetails { code, message }, workspace_tokens);

        (status, Json(body)).into_response()
    }
}

/// Error part of a failed envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_envelope_response(None)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let field = errs.field_errors().keys().next().map(|f| f.to_string());
        AppError::InvalidInput {
            message: errs.to_string(),
            field,
        }
    }
}

impl From<ErrorDetails> for AppError {
    fn from(details: ErrorDetails) -> Self {
        AppError::Remote {
            code: details.code,
            message: details.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::not_found("Comment", "abc");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Comment not found: abc");
    }

    #[test]
    fn test_input_too_long_is_invalid_input() {
        let err = AppError::InputTooLong {
            field: "content".into(),
            max: 500,
        };
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_auth_errors() {
        let err = AppError::WorkspaceTokenExpired;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = AppError::PermissionDenied {
            required: "admin".into(),
            actual: "editor".into(),
        };
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "Something went wrong".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }

    async fn envelope_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_envelope_response(None);
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_server_error_detail_is_not_sent() {
        let (status, body) = envelope_of(AppError::DatabaseConnection {
            message: "password authentication failed for user textspace".into(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert_eq!(body["error"]["message"], "Internal server error");

        let (_, body) = envelope_of(AppError::not_found("Text", "abc")).await;
        assert_eq!(body["error"]["message"], "Text not found: abc");
    }

    #[test]
    fn test_error_code_wire_format() {
        let json = serde_json::to_string(&ErrorCode::InvalidWorkspaceToken).unwrap();
        assert_eq!(json, "\"INVALID_WORKSPACE_TOKEN\"");

        let code: ErrorCode = serde_json::from_str("\"NOT_FOUND\"").unwrap();
        assert_eq!(code, ErrorCode::NotFound);
    }

    #[test]
    fn test_remote_error_keeps_code() {
        let err: AppError = ErrorDetails {
            code: ErrorCode::PermissionDenied,
            message: "nope".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        assert_eq!(err.to_string(), "nope");
    }
}
