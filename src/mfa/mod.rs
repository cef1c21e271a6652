//! Step-up multi-factor authentication core.
//!
//! Flow Overview:
//! 1) After primary sign-in, the assurance evaluator compares the
//!    session's proven strength against what the account's factors
//!    demand.
//! 2) If step-up is required, the challenge coordinator drives one
//!    proof-of-possession round against a verified factor; success
//!    upgrades the session to AAL2.
//! 3) The enrollment coordinator drives a new TOTP factor from pending to
//!    verified, owning the one-time secret while the flow is in flight.
//! 4) Disabling 2FA is the same challenge contract, gating
//!    `FactorRegistry::remove` on the last verified factor.
//!
//! Security boundaries:
//! - The enrollment secret never outlives the in-flight flow and is
//!   relayed to the user exactly once.
//! - Challenges are single-use; a submitted attempt consumes them.
//! - Factor ownership is enforced by the identity provider, never
//!   inferred from client input.

pub mod assurance;
pub mod challenge;
pub mod code;
pub mod enrollment;
pub mod error;
pub mod factor;
pub mod registry;

pub use assurance::{AssuranceEvaluator, AssuranceLevel, AssuranceLevels, StepUpDecision};
pub use challenge::{ChallengeCoordinator, ChallengeId};
pub use code::OneTimeCode;
pub use enrollment::{EnrollingFactor, EnrollmentCoordinator};
pub use error::MfaError;
pub use factor::{Factor, FactorId, FactorKind, FactorSet, FactorStatus};
pub use registry::FactorRegistry;
