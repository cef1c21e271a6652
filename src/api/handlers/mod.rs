//! HTTP handlers for the step-up auth surface.

pub(crate) mod health;
pub(crate) mod mfa;
pub(crate) mod principal;
pub(crate) mod stepup;
pub(crate) mod types;

use crate::mfa::error::MfaError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

/// Map a taxonomy error onto an HTTP status.
pub(crate) fn error_status(err: &MfaError) -> StatusCode {
    match err {
        MfaError::Validation(_) => StatusCode::BAD_REQUEST,
        MfaError::Unauthenticated => StatusCode::UNAUTHORIZED,
        MfaError::NotFound => StatusCode::NOT_FOUND,
        MfaError::InvalidCode | MfaError::ChallengeExpired => StatusCode::BAD_REQUEST,
        MfaError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        MfaError::StateConflict(_) | MfaError::NoVerifiedFactor => StatusCode::CONFLICT,
    }
}

/// Uniform error body for every taxonomy rejection.
pub(crate) fn error_response(err: &MfaError) -> Response {
    if err.is_retryable() {
        error!("step-up operation failed: {err}");
    } else {
        warn!("step-up operation rejected: {err}");
    }
    (
        error_status(err),
        Json(types::ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}
