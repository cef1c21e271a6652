//! HTTP adapter for the hosted identity provider.
//!
//! This is the single boundary where provider-specific response shapes
//! become the closed error taxonomy: status classes and `error_code`
//! fields are translated here, and no provider error string leaks into
//! core logic.

use crate::{
    mfa::{
        assurance::{AssuranceLevel, AssuranceLevels},
        challenge::ChallengeId,
        code::OneTimeCode,
        error::MfaError,
        factor::{Factor, FactorId, FactorKind, FactorStatus},
    },
    provider::{ChallengeGrant, EnrolledFactor, IdentityProvider, ProviderFactory},
    APP_USER_AGENT,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Builds session-scoped HTTP provider handles that share one client.
#[derive(Clone)]
pub struct HttpProviderFactory {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpProviderFactory {
    /// Build a factory for the provider at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed or the
    /// URL cannot serve as a base.
    pub fn new(base_url: &Url) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("Failed to build identity provider HTTP client")?;

        // Keep a trailing slash so joins append instead of replacing the
        // last path segment.
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(Self {
            client,
            base_url,
            api_key: None,
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn for_session(&self, access_token: &str) -> Arc<dyn IdentityProvider> {
        Arc::new(HttpIdentityProvider {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            access_token: SecretString::from(access_token.to_string()),
        })
    }
}

/// Provider handle carrying one session's bearer token.
pub struct HttpIdentityProvider {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    access_token: SecretString,
}

impl HttpIdentityProvider {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, MfaError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|_| MfaError::ServiceUnavailable)?;

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(self.access_token.expose_secret());
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|_| MfaError::ServiceUnavailable)?;
        let status = response.status();
        let payload = response.json::<Value>().await.unwrap_or(Value::Null);

        if status.is_success() {
            Ok(payload)
        } else {
            let error = translate_error(status, &payload);
            debug!(%status, ?error, "identity provider rejected request");
            Err(error)
        }
    }
}

/// Translate a provider failure into the taxonomy. Recognized
/// `error_code` values win over status classes; everything unclassified
/// is the generic retryable `ServiceUnavailable`.
fn translate_error(status: StatusCode, body: &Value) -> MfaError {
    let code = body
        .get("error_code")
        .and_then(Value::as_str)
        .unwrap_or_default();
    match code {
        "invalid_code" | "mfa_verification_failed" => return MfaError::InvalidCode,
        "challenge_expired" | "mfa_challenge_expired" => return MfaError::ChallengeExpired,
        "factor_not_found" | "challenge_not_found" => return MfaError::NotFound,
        _ => {}
    }

    match status {
        StatusCode::UNAUTHORIZED => MfaError::Unauthenticated,
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => MfaError::NotFound,
        StatusCode::GONE => MfaError::ChallengeExpired,
        _ => MfaError::ServiceUnavailable,
    }
}

fn string_field(value: &Value, field: &str) -> Result<String, MfaError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(MfaError::ServiceUnavailable)
}

fn parse_factor(value: &Value) -> Option<Factor> {
    let kind = FactorKind::from_str(value.get("kind")?.as_str()?)?;
    let status = FactorStatus::from_str(value.get("status")?.as_str()?)?;
    Some(Factor {
        id: FactorId::new(value.get("id")?.as_str()?),
        kind,
        label: value
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        status,
    })
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn enroll_factor(
        &self,
        kind: FactorKind,
        label: &str,
    ) -> Result<EnrolledFactor, MfaError> {
        let payload = self
            .request(
                Method::POST,
                "auth/v1/factors",
                Some(json!({ "kind": kind.as_str(), "label": label })),
            )
            .await?;

        Ok(EnrolledFactor {
            id: FactorId::new(string_field(&payload, "id")?),
            secret: SecretString::from(string_field(&payload, "secret")?),
            otpauth_uri: string_field(&payload, "otpauth_uri")?,
            qr_image: string_field(&payload, "qr_image")?,
        })
    }

    async fn unenroll_factor(&self, factor_id: &FactorId) -> Result<(), MfaError> {
        self.request(
            Method::DELETE,
            &format!("auth/v1/factors/{factor_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn list_factors(&self) -> Result<Vec<Factor>, MfaError> {
        let payload = self.request(Method::GET, "auth/v1/factors", None).await?;
        let factors = payload
            .get("factors")
            .and_then(Value::as_array)
            .ok_or(MfaError::ServiceUnavailable)?;
        // Factors of kinds this service does not support are skipped, not
        // errors.
        Ok(factors.iter().filter_map(parse_factor).collect())
    }

    async fn create_challenge(&self, factor_id: &FactorId) -> Result<ChallengeGrant, MfaError> {
        let payload = self
            .request(
                Method::POST,
                &format!("auth/v1/factors/{factor_id}/challenge"),
                None,
            )
            .await?;

        Ok(ChallengeGrant {
            challenge_id: ChallengeId::new(string_field(&payload, "challenge_id")?),
            expires_in_seconds: payload.get("expires_in").and_then(Value::as_u64),
        })
    }

    async fn verify_challenge(
        &self,
        factor_id: &FactorId,
        challenge_id: &ChallengeId,
        code: &OneTimeCode,
    ) -> Result<(), MfaError> {
        self.request(
            Method::POST,
            &format!("auth/v1/factors/{factor_id}/verify"),
            Some(json!({
                "challenge_id": challenge_id.as_str(),
                "code": code.as_str(),
            })),
        )
        .await?;
        Ok(())
    }

    async fn assurance_levels(&self) -> Result<AssuranceLevels, MfaError> {
        let payload = self.request(Method::GET, "auth/v1/assurance", None).await?;
        let current = AssuranceLevel::from_str(&string_field(&payload, "current_level")?)
            .ok_or(MfaError::ServiceUnavailable)?;
        let next = AssuranceLevel::from_str(&string_field(&payload, "next_level")?)
            .ok_or(MfaError::ServiceUnavailable)?;
        Ok(AssuranceLevels { current, next })
    }
}
