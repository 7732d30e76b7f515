use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::forms::repository::RepositoryError;
use crate::forms::validation::ValidationErrors;
use crate::storage::StorageError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;
use tracing::{debug, error};

const GENERIC_FAILURE: &str = "Internal Server Error";

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Validation(ValidationErrors),
    BadRequest(String),
    Auth(AuthError),
    NotFound(String),
    ApprovalRejected,
    Misconfigured(String),
    Repository(RepositoryError),
    Storage(StorageError),
    Io(std::io::Error),
    Server(axum::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::ApprovalRejected => {
                StatusCode::BAD_REQUEST
            }
            AppError::Auth(err) => err.status(),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Misconfigured(_)
            | AppError::Repository(_)
            | AppError::Storage(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients. Internal failures collapse to a generic line.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Validation failed".to_string(),
            AppError::BadRequest(message)
            | AppError::NotFound(message)
            | AppError::Misconfigured(message) => message.clone(),
            AppError::ApprovalRejected => {
                "Cannot approve: form must be reviewed first (or already approved).".to_string()
            }
            AppError::Auth(err) if !err.is_internal() => err.to_string(),
            AppError::Storage(StorageError::NotFound(_)) => "File not found".to_string(),
            AppError::Storage(StorageError::NotConfigured) => {
                "Server misconfigured: object storage bucket missing".to_string()
            }
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Validation(err) => write!(f, "{}", err),
            AppError::BadRequest(message) => write!(f, "bad request: {}", message),
            AppError::Auth(err) => write!(f, "auth error: {}", err),
            AppError::NotFound(message) => write!(f, "not found: {}", message),
            AppError::ApprovalRejected => write!(f, "approval guard not satisfied"),
            AppError::Misconfigured(message) => write!(f, "{}", message),
            AppError::Repository(err) => write!(f, "repository error: {}", err),
            AppError::Storage(err) => write!(f, "storage error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Validation(err) => Some(err),
            AppError::Auth(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::Storage(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::BadRequest(_)
            | AppError::NotFound(_)
            | AppError::ApprovalRejected
            | AppError::Misconfigured(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.public_message();

        if status.is_server_error() {
            error!(status = status.as_u16(), %message, "request failed");
            debug!(error = ?self, "request failure detail");
        }

        let body = match self {
            AppError::Validation(errors) => json!({
                "success": false,
                "message": message,
                "errors": errors,
            }),
            _ => json!({ "success": false, "message": message }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}
