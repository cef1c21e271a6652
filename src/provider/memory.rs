//! In-memory identity provider for local development and tests.
//!
//! Full-fidelity stand-in for the hosted provider: real TOTP secrets and
//! code verification, single-use challenges with expiry, per-account
//! factor scoping, and per-session assurance state. The server wires it
//! up when `--provider-url memory:` is selected, the way a logging email
//! sender stands in for a real one in local runs.

use crate::{
    mfa::{
        assurance::{AssuranceLevel, AssuranceLevels},
        challenge::ChallengeId,
        code::OneTimeCode,
        error::MfaError,
        factor::{Factor, FactorId, FactorKind, FactorStatus},
    },
    provider::{ChallengeGrant, EnrolledFactor, IdentityProvider, ProviderFactory},
};
use async_trait::async_trait;
use secrecy::SecretString;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};
use totp_rs::{Algorithm, Secret, TOTP};
use uuid::Uuid;

const CHALLENGE_TTL: Duration = Duration::from_secs(5 * 60);

struct FactorRecord {
    id: FactorId,
    label: String,
    status: FactorStatus,
    totp: TOTP,
}

#[derive(Default)]
struct AccountRecord {
    factors: Vec<FactorRecord>,
    /// Forces `next == AAL2` even with no factors; used to model a
    /// policy/state desync.
    step_up_forced: bool,
}

struct SessionRecord {
    account: String,
    stepped_up: bool,
}

struct ChallengeRecord {
    account: String,
    factor_id: FactorId,
    issued_at: Instant,
    consumed: bool,
}

#[derive(Default)]
struct Directory {
    accounts: HashMap<String, AccountRecord>,
    sessions: HashMap<String, SessionRecord>,
    challenges: HashMap<String, ChallengeRecord>,
    challenges_issued: u64,
}

struct DirectoryInner {
    issuer: String,
    state: Mutex<Directory>,
}

/// Shared in-memory account/factor/session directory.
///
/// Clones share state; [`ProviderFactory::for_session`] mints
/// session-scoped handles for the coordinators.
#[derive(Clone)]
pub struct MemoryDirectory {
    inner: Arc<DirectoryInner>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                issuer: issuer.into(),
                state: Mutex::new(Directory::default()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Directory> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a primary-authenticated (AAL1) session for an account,
    /// creating the account on first use. Returns the session token.
    pub fn sign_in(&self, account: &str) -> String {
        let token = format!("session_{}", Uuid::new_v4());
        let mut dir = self.lock();
        dir.accounts.entry(account.to_string()).or_default();
        dir.sessions.insert(
            token.clone(),
            SessionRecord {
                account: account.to_string(),
                stepped_up: false,
            },
        );
        token
    }

    /// Seed an already-verified factor, as if a prior enrollment had
    /// completed. Dev/test convenience.
    pub fn enroll_verified(&self, account: &str, label: &str) -> FactorId {
        let record = self
            .new_factor_record(account, label, FactorStatus::Verified)
            .expect("valid generated seed");
        let id = record.id.clone();
        let mut dir = self.lock();
        dir.accounts
            .entry(account.to_string())
            .or_default()
            .factors
            .push(record);
        id
    }

    /// The code a real authenticator app would display right now for one
    /// of the account's factors. Empty when the factor is unknown.
    #[must_use]
    pub fn current_code(&self, account: &str, factor_id: &FactorId) -> String {
        let dir = self.lock();
        dir.accounts
            .get(account)
            .and_then(|record| record.factors.iter().find(|f| f.id == *factor_id))
            .and_then(|factor| factor.totp.generate_current().ok())
            .unwrap_or_default()
    }

    /// Derive the current code from a base32 seed, the way an
    /// authenticator app would after scanning the QR.
    #[must_use]
    pub fn code_for_secret(secret_base32: &str) -> String {
        Secret::Encoded(secret_base32.to_string())
            .to_bytes()
            .ok()
            .and_then(|bytes| {
                TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes, None, "user".to_string()).ok()
            })
            .and_then(|totp| totp.generate_current().ok())
            .unwrap_or_default()
    }

    /// Total challenges ever issued; lets tests assert an operation never
    /// reached the provider.
    #[must_use]
    pub fn challenge_count(&self) -> u64 {
        self.lock().challenges_issued
    }

    /// Drop all of an account's factors while still demanding AAL2,
    /// modeling a policy/state desync.
    pub fn strip_factors_keeping_requirement(&self, account: &str) {
        let mut dir = self.lock();
        let record = dir.accounts.entry(account.to_string()).or_default();
        record.factors.clear();
        record.step_up_forced = true;
    }

    fn new_factor_record(
        &self,
        account: &str,
        label: &str,
        status: FactorStatus,
    ) -> Result<FactorRecord, MfaError> {
        let totp = build_totp(&self.inner.issuer, account)?;
        Ok(FactorRecord {
            id: FactorId::new(Uuid::new_v4().to_string()),
            label: label.to_string(),
            status,
            totp,
        })
    }
}

fn build_totp(issuer: &str, account: &str) -> Result<TOTP, MfaError> {
    // 160-bit generated seed per RFC 6238. The otpauth URI rules reject
    // ':' in issuer and account labels, so sanitize both.
    let seed = Secret::generate_secret()
        .to_bytes()
        .map_err(|_| MfaError::ServiceUnavailable)?;
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        seed,
        Some(issuer.replace(':', " ")),
        account.replace(':', " "),
    )
    .map_err(|_| MfaError::ServiceUnavailable)
}

impl ProviderFactory for MemoryDirectory {
    fn for_session(&self, access_token: &str) -> Arc<dyn IdentityProvider> {
        Arc::new(MemorySession {
            directory: self.clone(),
            token: access_token.to_string(),
        })
    }
}

/// Session-scoped handle over the shared directory.
pub struct MemorySession {
    directory: MemoryDirectory,
    token: String,
}

impl MemorySession {
    fn account_of(dir: &Directory, token: &str) -> Result<String, MfaError> {
        dir.sessions
            .get(token)
            .map(|session| session.account.clone())
            .ok_or(MfaError::Unauthenticated)
    }
}

#[async_trait]
impl IdentityProvider for MemorySession {
    async fn enroll_factor(
        &self,
        _kind: FactorKind,
        label: &str,
    ) -> Result<EnrolledFactor, MfaError> {
        let account = Self::account_of(&self.directory.lock(), &self.token)?;
        let record = self
            .directory
            .new_factor_record(&account, label, FactorStatus::Pending)?;

        let secret = SecretString::from(record.totp.get_secret_base32());
        let otpauth_uri = record.totp.get_url();
        let qr_image = record
            .totp
            .get_qr_base64()
            .map(|qr| format!("data:image/png;base64,{qr}"))
            .map_err(|_| MfaError::ServiceUnavailable)?;
        let id = record.id.clone();

        let mut dir = self.directory.lock();
        dir.accounts
            .entry(account)
            .or_default()
            .factors
            .push(record);

        Ok(EnrolledFactor {
            id,
            secret,
            otpauth_uri,
            qr_image,
        })
    }

    async fn unenroll_factor(&self, factor_id: &FactorId) -> Result<(), MfaError> {
        let mut dir = self.directory.lock();
        let account = Self::account_of(&dir, &self.token)?;
        let record = dir.accounts.get_mut(&account).ok_or(MfaError::NotFound)?;
        let position = record
            .factors
            .iter()
            .position(|factor| factor.id == *factor_id)
            .ok_or(MfaError::NotFound)?;
        record.factors.remove(position);
        Ok(())
    }

    async fn list_factors(&self) -> Result<Vec<Factor>, MfaError> {
        let dir = self.directory.lock();
        let account = Self::account_of(&dir, &self.token)?;
        let factors = dir
            .accounts
            .get(&account)
            .map(|record| {
                record
                    .factors
                    .iter()
                    .map(|factor| Factor {
                        id: factor.id.clone(),
                        kind: FactorKind::Totp,
                        label: factor.label.clone(),
                        status: factor.status,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(factors)
    }

    async fn create_challenge(&self, factor_id: &FactorId) -> Result<ChallengeGrant, MfaError> {
        let mut dir = self.directory.lock();
        let account = Self::account_of(&dir, &self.token)?;
        let owned = dir
            .accounts
            .get(&account)
            .is_some_and(|record| record.factors.iter().any(|f| f.id == *factor_id));
        if !owned {
            return Err(MfaError::NotFound);
        }

        let challenge_id = ChallengeId::new(Uuid::new_v4().to_string());
        dir.challenges.insert(
            challenge_id.as_str().to_string(),
            ChallengeRecord {
                account,
                factor_id: factor_id.clone(),
                issued_at: Instant::now(),
                consumed: false,
            },
        );
        dir.challenges_issued += 1;

        Ok(ChallengeGrant {
            challenge_id,
            expires_in_seconds: Some(CHALLENGE_TTL.as_secs()),
        })
    }

    async fn verify_challenge(
        &self,
        factor_id: &FactorId,
        challenge_id: &ChallengeId,
        code: &OneTimeCode,
    ) -> Result<(), MfaError> {
        let mut guard = self.directory.lock();
        let dir = &mut *guard;
        let account = Self::account_of(dir, &self.token)?;

        let challenge = dir
            .challenges
            .get_mut(challenge_id.as_str())
            .ok_or(MfaError::NotFound)?;
        if challenge.account != account || challenge.factor_id != *factor_id {
            return Err(MfaError::NotFound);
        }
        if challenge.consumed || challenge.issued_at.elapsed() > CHALLENGE_TTL {
            return Err(MfaError::ChallengeExpired);
        }
        // One verify attempt per challenge, successful or not.
        challenge.consumed = true;

        let factor = dir
            .accounts
            .get_mut(&account)
            .and_then(|record| record.factors.iter_mut().find(|f| f.id == *factor_id))
            .ok_or(MfaError::NotFound)?;

        let valid = factor
            .totp
            .check_current(code.as_str())
            .map_err(|_| MfaError::ServiceUnavailable)?;
        if !valid {
            return Err(MfaError::InvalidCode);
        }

        match factor.status {
            // First successful proof confirms the enrollment.
            FactorStatus::Pending => factor.status = FactorStatus::Verified,
            // Proof against a verified factor upgrades this session only.
            FactorStatus::Verified => {
                if let Some(session) = dir.sessions.get_mut(&self.token) {
                    session.stepped_up = true;
                }
            }
        }
        Ok(())
    }

    async fn assurance_levels(&self) -> Result<AssuranceLevels, MfaError> {
        let dir = self.directory.lock();
        let session = dir
            .sessions
            .get(&self.token)
            .ok_or(MfaError::Unauthenticated)?;
        let account = dir.accounts.get(&session.account);

        let requires_second_factor = account.is_some_and(|record| {
            record.step_up_forced
                || record
                    .factors
                    .iter()
                    .any(|f| f.status == FactorStatus::Verified)
        });

        Ok(AssuranceLevels {
            current: if session.stepped_up {
                AssuranceLevel::Aal2
            } else {
                AssuranceLevel::Aal1
            },
            next: if requires_second_factor {
                AssuranceLevel::Aal2
            } else {
                AssuranceLevel::Aal1
            },
        })
    }
}
