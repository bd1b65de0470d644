use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Unique error codes for client identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database errors (1xxx)
    DatabaseError = 1001,

    // Validation errors (2xxx)
    MissingField = 2001,
    InvalidField = 2002,
    UnsupportedAttachment = 2003,
    AttachmentTooLarge = 2004,
    BadMultipart = 2005,

    // Attachment storage errors (5xxx)
    StorageError = 5001,

    // Resource errors (6xxx)
    NotFound = 6001,

    // Internal errors (9xxx)
    InternalError = 9001,
    ConfigurationError = 9002,
}

impl ErrorCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

/// Error type for every fallible path in the service.
///
/// The taxonomy is deliberately small: invalid input (400), missing
/// resource (404), and datastore/filesystem failure (500). Update and
/// delete on an unknown id are *not* errors; they report a zero count.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("Unsupported attachment type {0:?}: only application/pdf is accepted")]
    UnsupportedAttachment(String),

    #[error("Attachment of {size} bytes exceeds the limit of {limit} bytes")]
    AttachmentTooLarge { size: usize, limit: usize },

    #[error("Malformed multipart request: {0}")]
    BadMultipart(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Attachment storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(resource: &'static str, id: i64) -> Self {
        Self::NotFound { resource, id }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingField(_) => ErrorCode::MissingField,
            Self::InvalidField { .. } => ErrorCode::InvalidField,
            Self::UnsupportedAttachment(_) => ErrorCode::UnsupportedAttachment,
            Self::AttachmentTooLarge { .. } => ErrorCode::AttachmentTooLarge,
            Self::BadMultipart(_) => ErrorCode::BadMultipart,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Storage(_) => ErrorCode::StorageError,
            Self::Config(_) => ErrorCode::ConfigurationError,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField(_)
            | Self::InvalidField { .. }
            | Self::UnsupportedAttachment(_)
            | Self::AttachmentTooLarge { .. }
            | Self::BadMultipart(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Database(_)
            | Self::Storage(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log based on severity
        match &self {
            AppError::MissingField(_)
            | AppError::InvalidField { .. }
            | AppError::UnsupportedAttachment(_)
            | AppError::AttachmentTooLarge { .. }
            | AppError::BadMultipart(_)
            | AppError::NotFound { .. } => {
                tracing::debug!(error_code = error_code.as_u16(), %message, "Client error");
            }
            _ => {
                tracing::error!(error_code = error_code.as_u16(), %message, error = ?self, "Server error");
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code.as_u16(),
                "status": status.as_u16(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_400() {
        assert_eq!(
            AppError::MissingField("title").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UnsupportedAttachment("image/png".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        // Oversize uploads sit in the invalid-input taxonomy, not 413
        assert_eq!(
            AppError::AttachmentTooLarge {
                size: 11_000_000,
                limit: 10_485_760
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn missing_resources_map_to_404() {
        let err = AppError::not_found("book", 42);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), ErrorCode::NotFound);
        assert_eq!(err.to_string(), "book 42 not found");
    }

    #[test]
    fn infrastructure_failures_map_to_500() {
        let io = AppError::Storage(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.error_code(), ErrorCode::StorageError);
    }
}
