//! Factor registry and TOTP enrollment endpoints.
//!
//! Flow Overview:
//! 1) `GET /factors` lists the account's factors and the enabled flag.
//! 2) `enroll/start` creates a pending factor and relays the secret/QR to
//!    the user exactly once; restarting replaces the pending factor.
//! 3) `enroll/finish` confirms with a first code; a wrong code keeps the
//!    in-flight state so the user can retry without re-scanning.
//! 4) `enroll/cancel` abandons the flow and unenrolls the pending factor.
//! 5) `totp/disable` removes the challenged factor after a successful
//!    proof; it shares the step-up challenge contract.

use crate::{
    api::{
        handlers::{error_response, principal::require_bearer, types},
        state::AuthState,
    },
    mfa::{
        enrollment::EnrollmentCoordinator, error::MfaError, registry::FactorRegistry,
    },
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;

const DEFAULT_FACTOR_LABEL: &str = "Bear Love";

/// List the account's factors partitioned by status.
#[utoipa::path(
    get,
    path = "/v1/auth/mfa/factors",
    responses(
        (status = 200, description = "Factors for the account", body = types::FactorsResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "mfa"
)]
pub async fn fetch_factors(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
) -> Response {
    let token = match require_bearer(&headers) {
        Ok(token) => token,
        Err(status) => return status.into_response(),
    };

    let registry = FactorRegistry::new(state.provider_for(&token));
    match registry.list().await {
        Ok(set) => (
            StatusCode::OK,
            Json(types::FactorsResponse {
                enabled: set.is_enabled(),
                pending: set.pending,
                verified: set.verified,
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

/// Start TOTP enrollment. The response carries the only copy of the
/// secret this service will ever emit.
#[utoipa::path(
    post,
    path = "/v1/auth/mfa/totp/enroll/start",
    request_body = types::EnrollStartRequest,
    responses(
        (status = 200, description = "Enrollment started", body = types::EnrollStartResponse),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Identity provider unavailable")
    ),
    tag = "mfa"
)]
pub async fn totp_enroll_start(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<types::EnrollStartRequest>>,
) -> Response {
    let token = match require_bearer(&headers) {
        Ok(token) => token,
        Err(status) => return status.into_response(),
    };

    let label = payload
        .and_then(|Json(request)| request.label)
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FACTOR_LABEL.to_string());

    let mut flow = match state.flows().take_enrollment(&token).await {
        Some(flow) => flow,
        None => EnrollmentCoordinator::new(state.provider_for(&token)),
    };

    match flow.start(&label).await {
        Ok(material) => {
            // Single point where the secret is exposed: the one-time relay
            // to the user.
            let response = types::EnrollStartResponse {
                factor_id: material.factor_id().clone(),
                secret: material.secret().expose_secret().to_string(),
                otpauth_uri: material.otpauth_uri().to_string(),
                qr_image: material.qr_image().to_string(),
            };
            state.flows().store_enrollment(&token, flow).await;
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            if flow.in_progress().is_some() {
                state.flows().store_enrollment(&token, flow).await;
            }
            error_response(&err)
        }
    }
}

/// Finish TOTP enrollment with the first code.
#[utoipa::path(
    post,
    path = "/v1/auth/mfa/totp/enroll/finish",
    request_body = types::EnrollFinishRequest,
    responses(
        (status = 200, description = "Factor verified", body = types::EnrollFinishResponse),
        (status = 400, description = "Invalid code"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "No enrollment in progress")
    ),
    tag = "mfa"
)]
pub async fn totp_enroll_finish(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<types::EnrollFinishRequest>>,
) -> Response {
    let token = match require_bearer(&headers) {
        Ok(token) => token,
        Err(status) => return status.into_response(),
    };

    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    let Some(mut flow) = state.flows().take_enrollment(&token).await else {
        return error_response(&MfaError::StateConflict("no enrollment in progress"));
    };

    match flow.verify(&request.code).await {
        Ok(factor_id) => {
            info!(%factor_id, "TOTP factor verified");
            (
                StatusCode::OK,
                Json(types::EnrollFinishResponse { factor_id }),
            )
                .into_response()
        }
        Err(err) => {
            // A rejected code keeps the enrollment alive for a retry.
            if flow.in_progress().is_some() {
                state.flows().store_enrollment(&token, flow).await;
            }
            error_response(&err)
        }
    }
}

/// Cancel an in-flight enrollment. Idempotent.
#[utoipa::path(
    post,
    path = "/v1/auth/mfa/totp/enroll/cancel",
    responses(
        (status = 204, description = "No enrollment left in flight"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Identity provider unavailable")
    ),
    tag = "mfa"
)]
pub async fn totp_enroll_cancel(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
) -> Response {
    let token = match require_bearer(&headers) {
        Ok(token) => token,
        Err(status) => return status.into_response(),
    };

    let Some(mut flow) = state.flows().take_enrollment(&token).await else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match flow.cancel().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            // Keep the flow so cancel can be retried.
            state.flows().store_enrollment(&token, flow).await;
            error_response(&err)
        }
    }
}

/// Disable 2FA by removing the challenged factor after a successful
/// proof. Requires a prior step-up challenge for that factor.
#[utoipa::path(
    post,
    path = "/v1/auth/mfa/totp/disable",
    request_body = types::VerifyRequest,
    responses(
        (status = 204, description = "Factor removed"),
        (status = 400, description = "Invalid code"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "No challenge in progress")
    ),
    tag = "mfa"
)]
pub async fn totp_disable(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<types::VerifyRequest>>,
) -> Response {
    let token = match require_bearer(&headers) {
        Ok(token) => token,
        Err(status) => return status.into_response(),
    };

    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    let Some(mut flow) = state.flows().take_challenge(&token).await else {
        return error_response(&MfaError::StateConflict("no challenge in progress"));
    };
    let Some(factor_id) = flow.challenged_factor().cloned() else {
        return error_response(&MfaError::StateConflict("no challenge in progress"));
    };

    match flow.verify(&request.code).await {
        Ok(()) => {
            let registry = FactorRegistry::new(state.provider_for(&token));
            match registry.remove(&factor_id).await {
                Ok(()) => {
                    info!(%factor_id, "2FA disabled after successful proof");
                    StatusCode::NO_CONTENT.into_response()
                }
                Err(err) => error_response(&err),
            }
        }
        Err(err) => {
            // Only a local validation rejection leaves the challenge
            // alive; a submitted attempt consumed it.
            if flow.challenged_factor().is_some() {
                state.flows().store_challenge(&token, flow).await;
            }
            error_response(&err)
        }
    }
}
