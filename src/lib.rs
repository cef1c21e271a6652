//! # Bear Love Step-Up Authentication
//!
//! `bearlove` is the step-up multi-factor authentication service behind
//! the Bear Love app. It sits between the frontend and the hosted
//! identity provider and owns the flows with real state-transition
//! semantics: TOTP factor enrollment, login-time step-up challenges, and
//! challenge-gated 2FA disablement.
//!
//! ## Flows
//!
//! - **Enrollment** drives a new factor from pending to verified. The
//!   one-time secret lives only in the in-flight flow state; a wrong code
//!   preserves that state so the user retries without re-scanning, and
//!   cancellation unenrolls the pending factor.
//! - **Step-up** compares the session's proven strength (AAL1/AAL2)
//!   against what the account's factors demand, then runs a single-use
//!   challenge/verify round. Success upgrades the session only, never the
//!   account.
//! - **Disable** reuses the same challenge contract to gate removal of
//!   the last verified factor.
//!
//! ## Boundaries
//!
//! - Accounts, sessions, factor storage, and challenge expiry belong to
//!   the identity provider, reached through the [`provider`] contract.
//! - Provider failure shapes are translated into one closed error
//!   taxonomy at the adapter boundary; core logic never inspects
//!   provider-specific strings.
//! - Coordinators are per-session state machines; there is exactly one
//!   in-flight enrollment and one in-flight challenge per session.

pub mod api;
pub mod cli;
pub mod mfa;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
