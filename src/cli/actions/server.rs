use crate::{
    api::{
        self,
        state::{AuthConfig, AuthState},
    },
    cli::commands::MEMORY_PROVIDER_URL,
    provider::{http::HttpProviderFactory, memory::MemoryDirectory, ProviderFactory},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub provider_url: String,
    pub provider_api_key: Option<String>,
    pub frontend_base_url: String,
    pub issuer: String,
    pub flow_ttl_seconds: u64,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the provider factory cannot be built or the server
/// fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let providers: Arc<dyn ProviderFactory> = if args.provider_url == MEMORY_PROVIDER_URL {
        let directory = MemoryDirectory::new(args.issuer.clone());
        // Local runs have no external sign-in to mint sessions, so seed
        // one and print its token.
        let token = directory.sign_in("demo@bearlove.app");
        info!("In-memory identity provider active; demo session token: {token}");
        Arc::new(directory)
    } else {
        let base_url = Url::parse(&args.provider_url)
            .with_context(|| format!("Invalid provider URL: {}", args.provider_url))?;
        let mut factory = HttpProviderFactory::new(&base_url)?;
        if let Some(api_key) = args.provider_api_key {
            factory = factory.with_api_key(api_key);
        }
        Arc::new(factory)
    };

    let config = AuthConfig::new(args.frontend_base_url)
        .with_issuer(args.issuer)
        .with_flow_ttl_seconds(args.flow_ttl_seconds);

    let auth_state = Arc::new(AuthState::new(config, providers));

    api::new(args.port, auth_state).await
}
