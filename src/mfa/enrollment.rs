//! Enrollment coordinator: single-flight addition of a new TOTP factor.
//!
//! State machine: `Idle -> Enrolling { factor_id, secret, qr } -> Idle`.
//! The coordinator owns the one-time enrollment material while the flow is
//! in flight; the presentation layer only reads it and dispatches
//! transitions. A wrong code preserves the state so the user can retry
//! without re-scanning; cancellation unenrolls the pending factor so none
//! are orphaned.

use crate::{
    mfa::{
        code::OneTimeCode,
        error::MfaError,
        factor::{FactorId, FactorKind},
    },
    provider::IdentityProvider,
};
use secrecy::SecretString;
use std::sync::Arc;

/// In-flight enrollment state, readable by the presentation layer.
#[derive(Debug, Clone)]
pub struct EnrollingFactor {
    factor_id: FactorId,
    secret: SecretString,
    otpauth_uri: String,
    qr_image: String,
}

impl EnrollingFactor {
    #[must_use]
    pub fn factor_id(&self) -> &FactorId {
        &self.factor_id
    }

    /// The shared seed, still wrapped; expose only at the single point
    /// where it is relayed to the user.
    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    #[must_use]
    pub fn otpauth_uri(&self) -> &str {
        &self.otpauth_uri
    }

    #[must_use]
    pub fn qr_image(&self) -> &str {
        &self.qr_image
    }
}

enum EnrollmentState {
    Idle,
    Enrolling(EnrollingFactor),
}

/// Drives a new factor from proposed to verified.
pub struct EnrollmentCoordinator {
    provider: Arc<dyn IdentityProvider>,
    state: EnrollmentState,
}

impl EnrollmentCoordinator {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            state: EnrollmentState::Idle,
        }
    }

    /// Current in-flight enrollment, if any.
    #[must_use]
    pub fn in_progress(&self) -> Option<&EnrollingFactor> {
        match &self.state {
            EnrollmentState::Idle => None,
            EnrollmentState::Enrolling(current) => Some(current),
        }
    }

    /// Request a new pending TOTP factor and hold its enrollment material.
    ///
    /// A prior in-flight enrollment is cancelled first (its pending factor
    /// unenrolled) so orphaned pending factors never accumulate.
    ///
    /// # Errors
    /// `ServiceUnavailable` (or another taxonomy variant) when the
    /// provider call fails; in that case the state stays idle.
    pub async fn start(&mut self, label: &str) -> Result<EnrollingFactor, MfaError> {
        if let EnrollmentState::Enrolling(current) = &self.state {
            self.provider.unenroll_factor(&current.factor_id).await?;
            self.state = EnrollmentState::Idle;
        }

        let enrolled = self.provider.enroll_factor(FactorKind::Totp, label).await?;
        let current = EnrollingFactor {
            factor_id: enrolled.id,
            secret: enrolled.secret,
            otpauth_uri: enrolled.otpauth_uri,
            qr_image: enrolled.qr_image,
        };
        self.state = EnrollmentState::Enrolling(current.clone());
        Ok(current)
    }

    /// Confirm the in-flight enrollment with a first code.
    ///
    /// Issues a challenge for the pending factor and submits the code
    /// against it. On acceptance the factor becomes verified and the state
    /// resets to idle. On rejection the enrollment state is preserved so a
    /// fresh code can be tried against the same factor.
    ///
    /// # Errors
    /// `Validation` for malformed codes (no network call), `StateConflict`
    /// when no enrollment is in progress (no network call), `InvalidCode`
    /// when the provider rejects the proof.
    pub async fn verify(&mut self, code: &str) -> Result<FactorId, MfaError> {
        let code = OneTimeCode::parse(code)?;

        let EnrollmentState::Enrolling(current) = &self.state else {
            return Err(MfaError::StateConflict("no enrollment in progress"));
        };

        let grant = self.provider.create_challenge(&current.factor_id).await?;
        self.provider
            .verify_challenge(&current.factor_id, &grant.challenge_id, &code)
            .await?;

        let factor_id = current.factor_id.clone();
        self.state = EnrollmentState::Idle;
        Ok(factor_id)
    }

    /// Abandon the in-flight enrollment, unenrolling its pending factor.
    ///
    /// Idempotent: cancelling with nothing in progress is a no-op.
    ///
    /// # Errors
    /// Provider failures per the taxonomy; the state is kept so cancel can
    /// be retried.
    pub async fn cancel(&mut self) -> Result<(), MfaError> {
        if let EnrollmentState::Enrolling(current) = &self.state {
            self.provider.unenroll_factor(&current.factor_id).await?;
            self.state = EnrollmentState::Idle;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::EnrollmentCoordinator;
    use crate::mfa::{error::MfaError, factor::FactorStatus, registry::FactorRegistry};
    use crate::provider::memory::MemoryDirectory;
    use crate::provider::ProviderFactory;
    use secrecy::ExposeSecret;

    const ACCOUNT: &str = "teddy@bearlove.app";

    #[tokio::test]
    async fn verify_without_start_never_reaches_the_provider() {
        let directory = MemoryDirectory::new("Bear Love");
        let token = directory.sign_in(ACCOUNT);
        let provider = directory.for_session(&token);

        let mut coordinator = EnrollmentCoordinator::new(provider);
        assert_eq!(
            coordinator.verify("123456").await,
            Err(MfaError::StateConflict("no enrollment in progress"))
        );
        assert_eq!(directory.challenge_count(), 0);
    }

    #[tokio::test]
    async fn start_then_cancel_leaves_no_pending_factor() {
        let directory = MemoryDirectory::new("Bear Love");
        let token = directory.sign_in(ACCOUNT);
        let provider = directory.for_session(&token);
        let registry = FactorRegistry::new(provider.clone());

        let before = registry.list().await;

        let mut coordinator = EnrollmentCoordinator::new(provider);
        assert!(coordinator.start("Bear Love").await.is_ok());
        assert!(coordinator.cancel().await.is_ok());
        assert!(coordinator.in_progress().is_none());

        let after = registry.list().await;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let directory = MemoryDirectory::new("Bear Love");
        let token = directory.sign_in(ACCOUNT);
        let provider = directory.for_session(&token);

        let mut coordinator = EnrollmentCoordinator::new(provider);
        assert_eq!(coordinator.cancel().await, Ok(()));
        assert_eq!(coordinator.cancel().await, Ok(()));
    }

    #[tokio::test]
    async fn restart_replaces_the_pending_factor() {
        let directory = MemoryDirectory::new("Bear Love");
        let token = directory.sign_in(ACCOUNT);
        let provider = directory.for_session(&token);
        let registry = FactorRegistry::new(provider.clone());

        let mut coordinator = EnrollmentCoordinator::new(provider);
        let first_id = coordinator
            .start("Bear Love")
            .await
            .map(|m| m.factor_id().clone());
        let second_id = coordinator
            .start("Bear Love")
            .await
            .map(|m| m.factor_id().clone());
        assert_ne!(first_id, second_id);

        // Only the second pending factor remains.
        let set = registry.list().await.unwrap_or_default();
        assert_eq!(set.pending.len(), 1);
        assert_eq!(Ok(set.pending[0].id.clone()), second_id);
    }

    #[tokio::test]
    async fn wrong_code_preserves_state_and_right_code_still_verifies() {
        let directory = MemoryDirectory::new("Bear Love");
        let token = directory.sign_in(ACCOUNT);
        let provider = directory.for_session(&token);
        let registry = FactorRegistry::new(provider.clone());

        let mut coordinator = EnrollmentCoordinator::new(provider);
        let material = coordinator.start("Bear Love").await;
        let (factor_id, secret) = match material {
            Ok(m) => (
                m.factor_id().clone(),
                m.secret().expose_secret().to_string(),
            ),
            Err(err) => panic!("start failed: {err}"),
        };

        assert_eq!(
            coordinator.verify("000000").await,
            Err(MfaError::InvalidCode)
        );
        // Enrollment survives the rejection: same factor, same secret.
        let preserved = coordinator.in_progress();
        assert_eq!(preserved.map(super::EnrollingFactor::factor_id), Some(&factor_id));

        let set = registry.list().await.unwrap_or_default();
        assert_eq!(set.pending.len(), 1);
        assert_eq!(set.pending[0].status, FactorStatus::Pending);

        let code = MemoryDirectory::code_for_secret(&secret);
        assert_eq!(coordinator.verify(&code).await, Ok(factor_id));
        assert!(coordinator.in_progress().is_none());

        let set = registry.list().await.unwrap_or_default();
        assert!(set.is_enabled());
        assert!(set.pending.is_empty());
    }

    #[tokio::test]
    async fn enrollment_material_is_complete() {
        let directory = MemoryDirectory::new("Bear Love");
        let token = directory.sign_in(ACCOUNT);
        let provider = directory.for_session(&token);

        let mut coordinator = EnrollmentCoordinator::new(provider);
        let Ok(material) = coordinator.start("Goldie's phone").await else {
            panic!("start failed");
        };
        assert!(material.otpauth_uri().starts_with("otpauth://totp/"));
        assert!(material.qr_image().starts_with("data:image/png;base64,"));
        assert!(!material.secret().expose_secret().is_empty());
    }
}
