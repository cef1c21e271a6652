//! Identity provider contract.
//!
//! The external identity provider owns accounts, sessions, factor storage,
//! TOTP secret generation, and challenge verification. The core talks to
//! it only through [`IdentityProvider`], injected at construction so tests
//! can substitute the in-memory implementation.
//!
//! A provider handle is scoped to one signed-in session: the HTTP adapter
//! carries that session's bearer token, the in-memory provider a session
//! key. [`ProviderFactory`] mints a handle per incoming request.

pub mod http;
pub mod memory;

use crate::mfa::{
    assurance::AssuranceLevels,
    challenge::ChallengeId,
    code::OneTimeCode,
    error::MfaError,
    factor::{Factor, FactorId, FactorKind},
};
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

/// Enrollment material for a freshly created pending factor.
///
/// The secret exists only here and in the provider; it is relayed to the
/// user exactly once and never persisted by this service.
#[derive(Debug, Clone)]
pub struct EnrolledFactor {
    pub id: FactorId,
    /// Base32 TOTP seed for manual entry.
    pub secret: SecretString,
    /// `otpauth://` URI encoding issuer, account label, and secret.
    pub otpauth_uri: String,
    /// Scannable representation of the URI, as a PNG data URL.
    pub qr_image: String,
}

/// A single-use challenge issued for one factor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeGrant {
    pub challenge_id: ChallengeId,
    /// Provider-declared lifetime. The provider is the source of truth
    /// for expiry; this is advisory for the UI.
    pub expires_in_seconds: Option<u64>,
}

/// Session-scoped operations exposed by the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a new pending factor and return its enrollment material.
    async fn enroll_factor(
        &self,
        kind: FactorKind,
        label: &str,
    ) -> Result<EnrolledFactor, MfaError>;

    /// Remove a factor regardless of status. `NotFound` when the id does
    /// not belong to the session's account.
    async fn unenroll_factor(&self, factor_id: &FactorId) -> Result<(), MfaError>;

    /// All factors for the session's account.
    async fn list_factors(&self) -> Result<Vec<Factor>, MfaError>;

    /// Issue a fresh single-use challenge for the given factor.
    async fn create_challenge(&self, factor_id: &FactorId) -> Result<ChallengeGrant, MfaError>;

    /// Submit a code against a specific challenge. Success upgrades the
    /// session's assurance level when the factor is verified, or confirms
    /// the factor when it is pending. Each challenge is consumed by its
    /// first verify attempt.
    async fn verify_challenge(
        &self,
        factor_id: &FactorId,
        challenge_id: &ChallengeId,
        code: &OneTimeCode,
    ) -> Result<(), MfaError>;

    /// Current and required assurance levels for the session.
    async fn assurance_levels(&self) -> Result<AssuranceLevels, MfaError>;
}

/// Mints a session-scoped provider handle from a request's access token.
pub trait ProviderFactory: Send + Sync {
    fn for_session(&self, access_token: &str) -> Arc<dyn IdentityProvider>;
}
