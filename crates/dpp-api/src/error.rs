//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Registry errors map onto HTTP status codes here and nowhere else.
//! Every error body has the shape `{"error": {"code": <status>, "message": ...}}`.
//! Internal error details are never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dpp_core::ValidationError;
use dpp_registry::RegistryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// HTTP status code, repeated in the body.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorBody {
    /// Build an error body for `status`.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: status.as_u16(),
                message: message.into(),
            },
        }
    }
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed body, missing field, or failed validation (400).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid bearer token (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Unknown passport or import job (404).
    #[error("{0}")]
    NotFound(String),

    /// Archived passport, illegal transition, or duplicate id (409).
    #[error("{0}")]
    Conflict(String),

    /// Request body exceeds the configured limit (413).
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Per-client rate limit exceeded (429).
    #[error("{0}")]
    TooManyRequests(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        (status, Json(ErrorBody::new(status, message))).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { .. } => Self::NotFound(err.to_string()),
            RegistryError::Validation(v) => Self::from(v),
            RegistryError::Archived(_)
            | RegistryError::Transition(_)
            | RegistryError::Duplicate(_) => Self::Conflict(err.to_string()),
            RegistryError::Internal(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpp_core::{ImportJobStatus, PassportId, TransitionError};
    use http_body_util::BodyExt;

    #[test]
    fn registry_not_found_maps_to_404() {
        let err = AppError::from(RegistryError::passport_not_found("DPP404"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "passport DPP404 not found");
    }

    #[test]
    fn validation_maps_to_400() {
        let err = AppError::from(RegistryError::Validation(ValidationError::MissingField(
            "platform".to_string(),
        )));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("platform"));
    }

    #[test]
    fn state_conflicts_map_to_409() {
        let archived = RegistryError::Archived(PassportId::from_static("DPP001"));
        let transition = RegistryError::Transition(TransitionError {
            from: ImportJobStatus::Completed,
            to: ImportJobStatus::Processing,
        });
        let duplicate = RegistryError::Duplicate(PassportId::from_static("DPP001"));
        for err in [archived, transition, duplicate] {
            assert_eq!(AppError::from(err).status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn registry_internal_maps_to_500() {
        let err = AppError::from(RegistryError::Internal("lock".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn remaining_statuses() {
        assert_eq!(
            AppError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::TooManyRequests("x".into()).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::PayloadTooLarge("x".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn envelope_carries_numeric_code() {
        let response = AppError::NotFound("passport DPP9 not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], 404);
        assert_eq!(body["error"]["message"], "passport DPP9 not found");
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let response = AppError::Internal("connection refused to db-7".into()).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], 500);
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }
}
