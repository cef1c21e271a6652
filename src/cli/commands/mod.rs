pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_PROVIDER_URL: &str = "provider-url";
pub const ARG_PROVIDER_API_KEY: &str = "provider-api-key";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_ISSUER: &str = "issuer";
pub const ARG_FLOW_TTL_SECONDS: &str = "flow-ttl-seconds";

/// Sentinel provider URL selecting the in-process provider for local
/// development.
pub const MEMORY_PROVIDER_URL: &str = "memory:";

/// Validate provider arguments clap cannot express on its own.
///
/// # Errors
/// Returns an error string if `provider-url` is neither `memory:` nor an
/// HTTP(S) URL.
pub fn validate(matches: &clap::ArgMatches) -> Result<(), String> {
    let Some(url) = matches.get_one::<String>(ARG_PROVIDER_URL) else {
        return Ok(()); // Should be handled by required=true in clap
    };

    if url != MEMORY_PROVIDER_URL && !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(format!(
            "--{ARG_PROVIDER_URL} must be '{MEMORY_PROVIDER_URL}' or an http(s) URL, got: {url}"
        ));
    }
    Ok(())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("bearlove")
        .about("Step-up multi-factor authentication service for Bear Love")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("BEARLOVE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_PROVIDER_URL)
                .long(ARG_PROVIDER_URL)
                .help("Identity provider base URL")
                .long_help(
                    "Identity provider base URL. Use 'memory:' to run the in-process provider for local development.",
                )
                .env("BEARLOVE_PROVIDER_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PROVIDER_API_KEY)
                .long(ARG_PROVIDER_API_KEY)
                .help("API key sent alongside session tokens to the identity provider")
                .env("BEARLOVE_PROVIDER_API_KEY"),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend origin allowed by CORS")
                .default_value("http://localhost:3000")
                .env("BEARLOVE_FRONTEND_BASE_URL"),
        )
        .arg(
            Arg::new(ARG_ISSUER)
                .long(ARG_ISSUER)
                .help("Issuer shown in authenticator apps for enrolled factors")
                .default_value("Bear Love")
                .env("BEARLOVE_ISSUER"),
        )
        .arg(
            Arg::new(ARG_FLOW_TTL_SECONDS)
                .long(ARG_FLOW_TTL_SECONDS)
                .help("Seconds before an abandoned enrollment/challenge flow is dropped")
                .default_value("600")
                .env("BEARLOVE_FLOW_TTL_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        );

    logging::with_args(command)
}
