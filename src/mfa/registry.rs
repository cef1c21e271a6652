//! Factor registry: queries and mutates the account's set of factors.

use crate::{
    mfa::{
        error::MfaError,
        factor::{FactorId, FactorSet},
    },
    provider::IdentityProvider,
};
use std::sync::Arc;

/// Read/write access to the current account's factors.
///
/// Ownership checks live in the identity provider: a factor id that does
/// not belong to the session's account is `NotFound`, never trusted from
/// client input.
pub struct FactorRegistry {
    provider: Arc<dyn IdentityProvider>,
}

impl FactorRegistry {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// All factors for the account, partitioned by status. Side-effect
    /// free.
    ///
    /// # Errors
    /// Provider failures per the taxonomy.
    pub async fn list(&self) -> Result<FactorSet, MfaError> {
        let factors = self.provider.list_factors().await?;
        Ok(FactorSet::partition(factors))
    }

    /// Unenroll a factor regardless of status. Used both to cancel a
    /// pending enrollment and to disable a verified factor.
    ///
    /// # Errors
    /// `NotFound` when the id does not belong to this account; provider
    /// failures per the taxonomy.
    pub async fn remove(&self, factor_id: &FactorId) -> Result<(), MfaError> {
        self.provider.unenroll_factor(factor_id).await
    }

    /// Whether the account effectively has 2FA enabled.
    ///
    /// # Errors
    /// Provider failures per the taxonomy.
    pub async fn is_enabled(&self) -> Result<bool, MfaError> {
        Ok(self.list().await?.is_enabled())
    }
}
