use crate::cli::{
    actions::{server, Action},
    commands,
};
use anyhow::{anyhow, Result};

/// Build the action to execute from parsed arguments.
///
/// # Errors
/// Returns an error when a required argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server(Box::new(server::Args {
        port: matches
            .get_one::<u16>(commands::ARG_PORT)
            .copied()
            .unwrap_or(8080),
        provider_url: matches
            .get_one::<String>(commands::ARG_PROVIDER_URL)
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --provider-url"))?,
        provider_api_key: matches
            .get_one::<String>(commands::ARG_PROVIDER_API_KEY)
            .cloned(),
        frontend_base_url: matches
            .get_one::<String>(commands::ARG_FRONTEND_BASE_URL)
            .cloned()
            .unwrap_or_else(|| "http://localhost:3000".to_string()),
        issuer: matches
            .get_one::<String>(commands::ARG_ISSUER)
            .cloned()
            .unwrap_or_else(|| "Bear Love".to_string()),
        flow_ttl_seconds: matches
            .get_one::<u64>(commands::ARG_FLOW_TTL_SECONDS)
            .copied()
            .unwrap_or(600),
    })))
}

#[cfg(test)]
mod tests {
    use super::handler;
    use crate::cli::{actions::Action, commands};

    #[test]
    fn handler_builds_server_args() {
        let matches = commands::new().get_matches_from([
            "bearlove",
            "--provider-url",
            "https://identity.bearlove.app",
            "--port",
            "8443",
            "--issuer",
            "Bear Love (staging)",
        ]);
        let action = handler(&matches);
        let Ok(Action::Server(args)) = action else {
            panic!("expected server action");
        };
        assert_eq!(args.port, 8443);
        assert_eq!(args.provider_url, "https://identity.bearlove.app");
        assert_eq!(args.issuer, "Bear Love (staging)");
        assert_eq!(args.flow_ttl_seconds, 600);
        assert!(args.provider_api_key.is_none());
    }
}
