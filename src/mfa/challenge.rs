//! Challenge coordinator: one proof-of-possession round for a verified
//! factor.
//!
//! State machine: `Idle -> Challenged { factor_id, challenge_id } -> Idle`.
//! The `{factor_id, challenge_id}` pairing lives in the state, so a verify
//! can only ever target the challenge that was actually issued; ordering
//! is structural, not a convention. A submitted attempt consumes the
//! challenge either way; retrying requires a fresh `challenge()` call.
//!
//! The same coordinator drives both call sites: login step-up and
//! disable-2FA confirmation.

use crate::{
    mfa::{
        code::OneTimeCode,
        error::MfaError,
        factor::{Factor, FactorId},
    },
    provider::IdentityProvider,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use utoipa::ToSchema;

/// Opaque single-use challenge token issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ChallengeId(String);

impl ChallengeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

enum ChallengeState {
    Idle,
    Challenged {
        factor_id: FactorId,
        challenge_id: ChallengeId,
    },
}

/// Drives one proof-of-possession exchange for an already-verified factor.
pub struct ChallengeCoordinator {
    provider: Arc<dyn IdentityProvider>,
    state: ChallengeState,
}

impl ChallengeCoordinator {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            state: ChallengeState::Idle,
        }
    }

    /// The factor currently under challenge, if any.
    #[must_use]
    pub fn challenged_factor(&self) -> Option<&FactorId> {
        match &self.state {
            ChallengeState::Idle => None,
            ChallengeState::Challenged { factor_id, .. } => Some(factor_id),
        }
    }

    /// Request a fresh single-use challenge for a verified factor.
    ///
    /// Starting a new challenge replaces any in-flight one; the abandoned
    /// challenge is left to provider-side expiry.
    ///
    /// # Errors
    /// `NotFound` when the factor does not exist for this account or is
    /// not verified; provider failures per the taxonomy.
    pub async fn challenge(&mut self, factor_id: &FactorId) -> Result<ChallengeId, MfaError> {
        let factors = self.provider.list_factors().await?;
        let eligible = factors
            .iter()
            .any(|factor| factor.id == *factor_id && factor.is_verified());
        if !eligible {
            return Err(MfaError::NotFound);
        }

        let grant = self.provider.create_challenge(factor_id).await?;
        self.state = ChallengeState::Challenged {
            factor_id: factor_id.clone(),
            challenge_id: grant.challenge_id.clone(),
        };
        Ok(grant.challenge_id)
    }

    /// Submit a code against the in-flight challenge.
    ///
    /// On success the provider upgrades the session's assurance level (for
    /// this session only). On a rejected code the challenge is consumed
    /// and the state returns to idle; the caller must issue a new
    /// `challenge()` before retrying.
    ///
    /// # Errors
    /// `Validation` for malformed codes (rejected locally, challenge kept),
    /// `StateConflict` when no challenge is in flight, `InvalidCode` or
    /// `ChallengeExpired` when the provider rejects the proof.
    pub async fn verify(&mut self, code: &str) -> Result<(), MfaError> {
        let code = OneTimeCode::parse(code)?;

        let ChallengeState::Challenged {
            factor_id,
            challenge_id,
        } = &self.state
        else {
            return Err(MfaError::StateConflict("no challenge in progress"));
        };

        let result = self
            .provider
            .verify_challenge(factor_id, challenge_id, &code)
            .await;

        // The attempt consumed the challenge whether or not it succeeded.
        self.state = ChallengeState::Idle;
        result
    }

    /// First verified factor eligible for this coordinator, if any.
    ///
    /// Convenience for call sites that expose "the" factor.
    ///
    /// # Errors
    /// Provider failures per the taxonomy.
    pub async fn default_factor(&self) -> Result<Option<Factor>, MfaError> {
        let factors = self.provider.list_factors().await?;
        Ok(factors.into_iter().find(Factor::is_verified))
    }
}
