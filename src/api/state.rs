//! Auth state, configuration, and per-session flow storage.

use crate::{
    mfa::{challenge::ChallengeCoordinator, enrollment::EnrollmentCoordinator},
    provider::{IdentityProvider, ProviderFactory},
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

const DEFAULT_FLOW_TTL_SECONDS: u64 = 10 * 60;
const DEFAULT_ISSUER: &str = "Bear Love";

/// Service configuration loaded at startup.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    issuer: String,
    flow_ttl_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            issuer: DEFAULT_ISSUER.to_string(),
            flow_ttl_seconds: DEFAULT_FLOW_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_flow_ttl_seconds(mut self, seconds: u64) -> Self {
        self.flow_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Issuer shown in authenticator apps for enrolled factors.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn flow_ttl_seconds(&self) -> u64 {
        self.flow_ttl_seconds
    }
}

struct StoredFlow<T> {
    flow: T,
    touched_at: Instant,
}

impl<T> StoredFlow<T> {
    fn fresh(flow: T) -> Self {
        Self {
            flow,
            touched_at: Instant::now(),
        }
    }

    fn live(&self, ttl: Duration) -> bool {
        self.touched_at.elapsed() < ttl
    }
}

/// Per-session coordinator storage.
///
/// Exactly one in-flight enrollment and one in-flight challenge per
/// session, keyed by the session's bearer token. Stale entries are swept
/// on insert and rejected on take; expiry drops only the in-memory state.
/// A pending factor left at the provider by an abandoned enrollment is NOT
/// unenrolled here — cleaning those up is a separately-operated policy,
/// not something this store guesses a TTL for.
pub struct FlowStore {
    ttl: Duration,
    enrollments: Mutex<HashMap<String, StoredFlow<EnrollmentCoordinator>>>,
    challenges: Mutex<HashMap<String, StoredFlow<ChallengeCoordinator>>>,
}

impl FlowStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            enrollments: Mutex::new(HashMap::new()),
            challenges: Mutex::new(HashMap::new()),
        }
    }

    /// Remove and return the session's in-flight enrollment, if it is
    /// still live.
    pub async fn take_enrollment(&self, session: &str) -> Option<EnrollmentCoordinator> {
        let mut flows = self.enrollments.lock().await;
        let stored = flows.remove(session)?;
        stored.live(self.ttl).then_some(stored.flow)
    }

    /// Park the session's enrollment, sweeping stale entries.
    pub async fn store_enrollment(&self, session: &str, flow: EnrollmentCoordinator) {
        let mut flows = self.enrollments.lock().await;
        flows.retain(|_, stored| stored.live(self.ttl));
        flows.insert(session.to_string(), StoredFlow::fresh(flow));
    }

    /// Remove and return the session's in-flight challenge, if it is
    /// still live.
    pub async fn take_challenge(&self, session: &str) -> Option<ChallengeCoordinator> {
        let mut flows = self.challenges.lock().await;
        let stored = flows.remove(session)?;
        stored.live(self.ttl).then_some(stored.flow)
    }

    /// Park the session's challenge, sweeping stale entries.
    pub async fn store_challenge(&self, session: &str, flow: ChallengeCoordinator) {
        let mut flows = self.challenges.lock().await;
        flows.retain(|_, stored| stored.live(self.ttl));
        flows.insert(session.to_string(), StoredFlow::fresh(flow));
    }
}

/// Shared state threaded through every handler.
pub struct AuthState {
    config: AuthConfig,
    providers: Arc<dyn ProviderFactory>,
    flows: FlowStore,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, providers: Arc<dyn ProviderFactory>) -> Self {
        let flows = FlowStore::new(Duration::from_secs(config.flow_ttl_seconds()));
        Self {
            config,
            providers,
            flows,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn flows(&self) -> &FlowStore {
        &self.flows
    }

    /// Provider handle scoped to the caller's session.
    #[must_use]
    pub fn provider_for(&self, access_token: &str) -> Arc<dyn IdentityProvider> {
        self.providers.for_session(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthConfig, AuthState, FlowStore};
    use crate::mfa::enrollment::EnrollmentCoordinator;
    use crate::provider::memory::MemoryDirectory;
    use crate::provider::ProviderFactory;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://bearlove.app".to_string());
        assert_eq!(config.frontend_base_url(), "https://bearlove.app");
        assert_eq!(config.issuer(), super::DEFAULT_ISSUER);
        assert_eq!(config.flow_ttl_seconds(), super::DEFAULT_FLOW_TTL_SECONDS);

        let config = config
            .with_issuer("Bear Love (staging)".to_string())
            .with_flow_ttl_seconds(42);
        assert_eq!(config.issuer(), "Bear Love (staging)");
        assert_eq!(config.flow_ttl_seconds(), 42);
    }

    #[tokio::test]
    async fn flow_store_round_trips_per_session() {
        let directory = MemoryDirectory::new("Bear Love");
        let token = directory.sign_in("teddy@bearlove.app");
        let store = FlowStore::new(Duration::from_secs(60));

        assert!(store.take_enrollment(&token).await.is_none());

        let flow = EnrollmentCoordinator::new(directory.for_session(&token));
        store.store_enrollment(&token, flow).await;

        assert!(store.take_enrollment(&token).await.is_some());
        // Taken, not copied: a second take finds nothing.
        assert!(store.take_enrollment(&token).await.is_none());
        // Other sessions never see it.
        assert!(store.take_enrollment("other-session").await.is_none());
    }

    #[tokio::test]
    async fn expired_flows_are_dropped_on_take() {
        let directory = MemoryDirectory::new("Bear Love");
        let token = directory.sign_in("teddy@bearlove.app");
        let store = FlowStore::new(Duration::ZERO);

        let flow = EnrollmentCoordinator::new(directory.for_session(&token));
        store.store_enrollment(&token, flow).await;
        assert!(store.take_enrollment(&token).await.is_none());
    }

    #[tokio::test]
    async fn auth_state_mints_session_scoped_providers() {
        let directory = MemoryDirectory::new("Bear Love");
        let token = directory.sign_in("teddy@bearlove.app");
        let state = AuthState::new(
            AuthConfig::new("https://bearlove.app".to_string()),
            Arc::new(directory),
        );

        let provider = state.provider_for(&token);
        assert!(provider.list_factors().await.is_ok());

        let stranger = state.provider_for("unknown-token");
        assert!(stranger.list_factors().await.is_err());
    }
}
