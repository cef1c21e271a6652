//! Second-factor credential model.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Opaque factor identifier assigned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FactorId(String);

impl FactorId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supported second-factor kinds. Only TOTP exists today.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Totp,
}

impl FactorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Totp => "totp",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "totp" => Some(Self::Totp),
            _ => None,
        }
    }
}

/// Verification state of a factor.
///
/// `Pending` factors were created by an enrollment that has not been
/// confirmed yet; only `Verified` factors are eligible for challenges.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FactorStatus {
    Pending,
    Verified,
}

impl FactorStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            _ => None,
        }
    }
}

/// A second-factor credential bound to one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Factor {
    pub id: FactorId,
    pub kind: FactorKind,
    /// Cosmetic free text, not unique.
    pub label: String,
    pub status: FactorStatus,
}

impl Factor {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.status == FactorStatus::Verified
    }
}

/// An account's factors partitioned by verification state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FactorSet {
    pub pending: Vec<Factor>,
    pub verified: Vec<Factor>,
}

impl FactorSet {
    /// Split a provider listing into pending and verified factors.
    #[must_use]
    pub fn partition(factors: Vec<Factor>) -> Self {
        let (verified, pending) = factors.into_iter().partition(Factor::is_verified);
        Self { pending, verified }
    }

    /// The account's effective "2FA enabled" predicate: at least one
    /// verified factor exists.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.verified.is_empty()
    }
}
