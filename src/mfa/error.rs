//! Closed error taxonomy for the step-up authentication core.
//!
//! Every coordinator returns these variants; provider-specific failure
//! shapes are translated into them inside the provider adapter, so no
//! upstream error string ever reaches core logic or callers.

use thiserror::Error;

/// Failure conditions surfaced by the MFA coordinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MfaError {
    /// Malformed input, rejected locally before any network round trip.
    #[error("invalid input: {0}")]
    Validation(&'static str),
    /// No valid session; the whole flow must restart from sign-in.
    #[error("not authenticated")]
    Unauthenticated,
    /// The referenced factor or challenge does not exist for this account.
    #[error("unknown factor or challenge")]
    NotFound,
    /// The provider rejected the submitted proof.
    #[error("code rejected")]
    InvalidCode,
    /// The challenge is past its expiry or was already consumed.
    #[error("challenge expired or already used")]
    ChallengeExpired,
    /// Transient provider or network failure; a fresh attempt may succeed.
    #[error("identity provider unavailable")]
    ServiceUnavailable,
    /// The operation does not fit the current flow state.
    #[error("conflicting flow state: {0}")]
    StateConflict(&'static str),
    /// Step-up is demanded by policy but the account has no verified factor.
    #[error("step-up required but no verified factor exists")]
    NoVerifiedFactor,
}

impl MfaError {
    /// Whether a caller may retry the same operation without changing input.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable)
    }

    /// Whether the session itself is unusable and sign-in must restart.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }
}
