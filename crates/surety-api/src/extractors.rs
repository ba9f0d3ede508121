//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! JSON bodies and parse path segments into protocol identifiers.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use surety_core::{AccountId, FlightKey};

use crate::error::AppError;

/// Request types that check business rules beyond what serde enforces.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse an account path segment.
pub fn account(segment: &str) -> Result<AccountId, AppError> {
    Ok(AccountId::new(segment)?)
}

/// Parse a flight key path segment (`airline|designator|scheduled_at`).
pub fn flight_key(segment: &str) -> Result<FlightKey, AppError> {
    Ok(segment.parse::<FlightKey>()?)
}
