//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps protocol errors from surety-core to HTTP status codes and returns
//! JSON bodies with error code, message, and details. Internal error details
//! are never exposed in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use surety_core::SuretyError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Protocol error kind, present for rejected protocol operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid bearer token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500). Logged, never returned to the client.
    #[error("internal error: {0}")]
    Internal(String),

    /// A protocol operation was rejected.
    #[error(transparent)]
    Protocol(#[from] SuretyError),
}

impl AppError {
    /// HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Protocol(err) => protocol_status(err),
        }
    }

    fn is_internal(&self) -> bool {
        self.status_and_code().0.is_server_error()
    }
}

fn protocol_status(err: &SuretyError) -> (StatusCode, &'static str) {
    match err {
        SuretyError::UnknownFlight(_)
        | SuretyError::UnknownAirline(_)
        | SuretyError::NoOpenRequest(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        SuretyError::NotAuthorized(_) | SuretyError::NotOperational(_) => {
            (StatusCode::FORBIDDEN, "FORBIDDEN")
        }
        SuretyError::AlreadyRegistered(_)
        | SuretyError::AlreadyVoted { .. }
        | SuretyError::DuplicateResponse { .. }
        | SuretyError::RequestClosed(_)
        | SuretyError::ProtocolPaused => (StatusCode::CONFLICT, "CONFLICT"),
        SuretyError::InsufficientFunds(_)
        | SuretyError::CapExceeded { .. }
        | SuretyError::InvalidAmount(_)
        | SuretyError::InvalidIndex { .. }
        | SuretyError::InvalidStatus(_)
        | SuretyError::InvalidIdentifier(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
        }
        SuretyError::TransferFailed { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if self.is_internal() {
            tracing::error!(error = %self, "internal server error");
        }
        let message = if self.is_internal() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };
        let details = match &self {
            Self::Protocol(err) if !self.is_internal() => {
                Some(serde_json::json!({ "kind": err.kind() }))
            }
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<surety_core::IdentityError> for AppError {
    fn from(err: surety_core::IdentityError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<surety_core::AmountParseError> for AppError {
    fn from(err: surety_core::AmountParseError) -> Self {
        Self::Validation(err.to_string())
    }
}
