//! Login step-up endpoints.
//!
//! After primary sign-in the frontend calls `evaluate`; when step-up is
//! required it must not treat the session as fully authenticated until
//! `verify` succeeds. `challenge`/`verify` use the same coordinator
//! contract as the disable-2FA flow.

use crate::{
    api::{
        handlers::{error_response, principal::require_bearer, types},
        state::AuthState,
    },
    mfa::{
        assurance::AssuranceEvaluator, challenge::ChallengeCoordinator, error::MfaError,
    },
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

/// Decide whether the session must complete a step-up challenge.
#[utoipa::path(
    post,
    path = "/v1/auth/step-up/evaluate",
    responses(
        (status = 200, description = "Step-up decision", body = crate::mfa::assurance::StepUpDecision),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Policy demands AAL2 but no verified factor exists")
    ),
    tag = "auth"
)]
pub async fn evaluate(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> Response {
    let token = match require_bearer(&headers) {
        Ok(token) => token,
        Err(status) => return status.into_response(),
    };

    let evaluator = AssuranceEvaluator::new(state.provider_for(&token));
    match evaluator.evaluate().await {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(err) => error_response(&err),
    }
}

/// Issue a single-use challenge for a verified factor.
#[utoipa::path(
    post,
    path = "/v1/auth/step-up/challenge",
    request_body = types::ChallengeStartRequest,
    responses(
        (status = 200, description = "Challenge issued", body = types::ChallengeStartResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Factor unknown or not verified")
    ),
    tag = "auth"
)]
pub async fn challenge(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<types::ChallengeStartRequest>>,
) -> Response {
    let token = match require_bearer(&headers) {
        Ok(token) => token,
        Err(status) => return status.into_response(),
    };

    let mut flow = match state.flows().take_challenge(&token).await {
        Some(flow) => flow,
        None => ChallengeCoordinator::new(state.provider_for(&token)),
    };

    let requested = payload.and_then(|Json(request)| request.factor_id);
    let factor_id = match requested {
        Some(factor_id) => factor_id,
        // The UI exposes "the" factor; default to the first verified one.
        None => match flow.default_factor().await {
            Ok(Some(factor)) => factor.id,
            Ok(None) => return error_response(&MfaError::NotFound),
            Err(err) => return error_response(&err),
        },
    };

    match flow.challenge(&factor_id).await {
        Ok(challenge_id) => {
            state.flows().store_challenge(&token, flow).await;
            (
                StatusCode::OK,
                Json(types::ChallengeStartResponse {
                    challenge_id,
                    factor_id,
                }),
            )
                .into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// Verify the code for the in-flight challenge; success upgrades the
/// session to AAL2 at the identity provider.
#[utoipa::path(
    post,
    path = "/v1/auth/step-up/verify",
    request_body = types::VerifyRequest,
    responses(
        (status = 204, description = "Session stepped up to AAL2"),
        (status = 400, description = "Invalid code or expired challenge"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "No challenge in progress")
    ),
    tag = "auth"
)]
pub async fn verify(
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

    match flow.verify(&request.code).await {
        Ok(()) => {
            info!("session stepped up to AAL2");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => {
            // Keep the flow only when the code never reached the
            // provider; a submitted attempt consumed the challenge.
            if flow.challenged_factor().is_some() {
                state.flows().store_challenge(&token, flow).await;
            }
            error_response(&err)
        }
    }
}
