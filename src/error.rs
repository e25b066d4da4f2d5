use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// AppError
///
/// The single error type crossing the handler boundary. Every variant maps to exactly one
/// HTTP status. Variants carrying collaborator failures (database, hashing, configuration,
/// internal) never expose their inner detail to the client; the detail is logged instead.
#[derive(Debug, Error)]
pub enum AppError {
    /// Unknown username or wrong password. Both collapse here so callers cannot enumerate users.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an account with this username already exists")]
    DuplicateAccount,

    /// Missing, malformed, expired or forged bearer token.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Valid token, but the role or ownership check failed.
    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorBody
///
/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::DuplicateAccount => StatusCode::CONFLICT,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_)
            | AppError::Database(_)
            | AppError::Hashing(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::DuplicateAccount => "DUPLICATE_ACCOUNT",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Configuration(_)
            | AppError::Database(_)
            | AppError::Hashing(_)
            | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-safe message. Collaborator failures are replaced by a generic sentence.
    fn public_message(&self) -> String {
        match self {
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::DuplicateAccount => "User already exists".to_string(),
            AppError::Unauthenticated(detail) => detail.clone(),
            AppError::Forbidden => "Forbidden".to_string(),
            AppError::NotFound(detail) | AppError::Validation(detail) => detail.clone(),
            AppError::Configuration(_)
            | AppError::Database(_)
            | AppError::Hashing(_)
            | AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed with internal error");
        }

        let body = ErrorBody {
            status_code: status.as_u16(),
            error: self.code().to_string(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
