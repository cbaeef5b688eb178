//! API error handling
//!
//! Every failure leaving a handler becomes an [`AppError`], rendered as
//! `{ "error": <code>, "message": <text> }`. Storage and hashing failures are
//! logged with detail and reported with a generic message only.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use enfor_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;

/// API error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code
    #[schema(example = "NOT_FOUND")]
    pub error: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidReference(String),

    #[error("A user with this email already exists")]
    EmailExists,

    /// Same message for an unknown email and a wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Missing or rejected bearer token
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidReference(_) => StatusCode::BAD_REQUEST,
            AppError::EmailExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidReference(_) => "INVALID_REFERENCE",
            AppError::EmailExists => "EMAIL_EXISTS",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(detail) => {
                error!(error = %detail, "Request failed with internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiError::new(self.code(), message))).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(kind) => AppError::NotFound(kind),
            CoreError::Validation(msg) => AppError::Validation(msg),
            CoreError::InvalidReference(msg) => AppError::InvalidReference(msg),
            CoreError::EmailExists => AppError::EmailExists,
            CoreError::Database(msg) => AppError::Internal(format!("database: {msg}")),
            CoreError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Only reached when issuing; validation failures go through the auth gate.
impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (CoreError::not_found("Client"), StatusCode::NOT_FOUND),
            (CoreError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                CoreError::InvalidReference("client".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (CoreError::EmailExists, StatusCode::CONFLICT),
            (
                CoreError::Database("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (core, status) in cases {
            assert_eq!(AppError::from(core).status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let (status, json) =
            body_of(AppError::from(CoreError::Database("password=hunter2".to_string()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "INTERNAL_ERROR");
        assert_eq!(json["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let (status, json) = body_of(AppError::NotFound("Client".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "NOT_FOUND");
        assert_eq!(json["message"], "Client not found");
    }
}
