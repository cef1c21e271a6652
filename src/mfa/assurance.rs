//! Assurance evaluator: decides whether a signed-in session must step up.
//!
//! Runs synchronously inside the sign-in sequence. A session whose
//! decision says step-up is required must not reach protected
//! functionality until the challenge coordinator reports success.

use crate::{
    mfa::{
        error::MfaError,
        factor::{Factor, FactorSet},
    },
    provider::IdentityProvider,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Authenticator assurance level of a session.
///
/// `Aal1` = primary factor only (password/OAuth); `Aal2` = a verified
/// second-factor challenge was completed in this session. Computed by the
/// identity provider; this service only reads it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssuranceLevel {
    Aal1,
    Aal2,
}

impl AssuranceLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aal1 => "aal1",
            Self::Aal2 => "aal2",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "aal1" => Some(Self::Aal1),
            "aal2" => Some(Self::Aal2),
            _ => None,
        }
    }
}

/// Session assurance as reported by the identity provider.
///
/// `current` is what this session has proven; `next` is what the account's
/// enrolled factors demand.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssuranceLevels {
    pub current: AssuranceLevel,
    pub next: AssuranceLevel,
}

/// Outcome of evaluating a session after primary sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StepUpDecision {
    pub step_up_required: bool,
    /// Verified factors eligible for the step-up challenge; empty when no
    /// step-up is required.
    pub factors: Vec<Factor>,
}

impl StepUpDecision {
    fn satisfied() -> Self {
        Self {
            step_up_required: false,
            factors: Vec::new(),
        }
    }
}

/// Whether the gap between required and proven strength demands a step-up.
#[must_use]
pub fn step_up_required(levels: AssuranceLevels) -> bool {
    levels.next == AssuranceLevel::Aal2 && levels.current == AssuranceLevel::Aal1
}

/// Reads session assurance and decides on step-up.
pub struct AssuranceEvaluator {
    provider: Arc<dyn IdentityProvider>,
}

impl AssuranceEvaluator {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Evaluate the current session against the account's required
    /// strength.
    ///
    /// # Errors
    /// `NoVerifiedFactor` when the provider demands AAL2 but the account
    /// has no verified factor: that is a policy/state desync and must
    /// surface rather than be silently bypassed. Provider failures per the
    /// taxonomy.
    pub async fn evaluate(&self) -> Result<StepUpDecision, MfaError> {
        let levels = self.provider.assurance_levels().await?;
        if !step_up_required(levels) {
            return Ok(StepUpDecision::satisfied());
        }

        let set = FactorSet::partition(self.provider.list_factors().await?);
        if set.verified.is_empty() {
            return Err(MfaError::NoVerifiedFactor);
        }

        Ok(StepUpDecision {
            step_up_required: true,
            factors: set.verified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{step_up_required, AssuranceEvaluator, AssuranceLevel, AssuranceLevels};
    use crate::mfa::error::MfaError;
    use crate::provider::memory::MemoryDirectory;
    use crate::provider::ProviderFactory;

    const ACCOUNT: &str = "honey@bearlove.app";

    #[test]
    fn level_round_trips() {
        assert_eq!(
            AssuranceLevel::from_str(AssuranceLevel::Aal1.as_str()),
            Some(AssuranceLevel::Aal1)
        );
        assert_eq!(
            AssuranceLevel::from_str(AssuranceLevel::Aal2.as_str()),
            Some(AssuranceLevel::Aal2)
        );
        assert_eq!(AssuranceLevel::from_str("aal3"), None);
    }

    #[test]
    fn step_up_only_when_aal2_is_pending() {
        let required = AssuranceLevels {
            current: AssuranceLevel::Aal1,
            next: AssuranceLevel::Aal2,
        };
        assert!(step_up_required(required));

        let satisfied = AssuranceLevels {
            current: AssuranceLevel::Aal2,
            next: AssuranceLevel::Aal2,
        };
        assert!(!step_up_required(satisfied));

        let no_second_factor = AssuranceLevels {
            current: AssuranceLevel::Aal1,
            next: AssuranceLevel::Aal1,
        };
        assert!(!step_up_required(no_second_factor));
    }

    #[tokio::test]
    async fn no_factors_means_no_step_up() {
        let directory = MemoryDirectory::new("Bear Love");
        let token = directory.sign_in(ACCOUNT);

        let evaluator = AssuranceEvaluator::new(directory.for_session(&token));
        let decision = evaluator.evaluate().await;
        assert_eq!(decision.map(|d| d.step_up_required), Ok(false));
    }

    #[tokio::test]
    async fn verified_factor_forces_step_up_on_fresh_session() {
        let directory = MemoryDirectory::new("Bear Love");
        let factor_id = directory.enroll_verified(ACCOUNT, "phone");
        let token = directory.sign_in(ACCOUNT);

        let evaluator = AssuranceEvaluator::new(directory.for_session(&token));
        match evaluator.evaluate().await {
            Ok(decision) => {
                assert!(decision.step_up_required);
                assert_eq!(decision.factors.len(), 1);
                assert_eq!(decision.factors[0].id, factor_id);
            }
            Err(err) => panic!("evaluate failed: {err}"),
        }
    }

    #[tokio::test]
    async fn desync_between_policy_and_factors_surfaces() {
        let directory = MemoryDirectory::new("Bear Love");
        directory.enroll_verified(ACCOUNT, "phone");
        let token = directory.sign_in(ACCOUNT);
        // Simulate a policy/state desync: AAL2 demanded, factor list empty.
        directory.strip_factors_keeping_requirement(ACCOUNT);

        let evaluator = AssuranceEvaluator::new(directory.for_session(&token));
        assert_eq!(evaluator.evaluate().await, Err(MfaError::NoVerifiedFactor));
    }

    #[tokio::test]
    async fn unknown_session_is_unauthenticated() {
        let directory = MemoryDirectory::new("Bear Love");
        let evaluator = AssuranceEvaluator::new(directory.for_session("bogus-token"));
        assert_eq!(evaluator.evaluate().await, Err(MfaError::Unauthenticated));
    }
}
