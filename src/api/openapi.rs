use super::handlers::{health, mfa, stepup};
use utoipa::openapi::{InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both
/// served and documented. Routes added outside (like `/`) are
/// intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add
    // the route to OpenAPI.
    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Step-up evaluation and challenges".to_string());

    let mut mfa_tag = Tag::new("mfa");
    mfa_tag.description = Some("Factor registry and TOTP enrollment".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Liveness".to_string());

    let mut openapi = cargo_openapi();
    openapi.tags = Some(vec![auth_tag, mfa_tag, health_tag]);

    OpenApiRouter::with_openapi(openapi)
        .routes(routes!(health::health))
        .routes(routes!(mfa::fetch_factors))
        .routes(routes!(mfa::totp_enroll_start))
        .routes(routes!(mfa::totp_enroll_finish))
        .routes(routes!(mfa::totp_enroll_cancel))
        .routes(routes!(mfa::totp_disable))
        .routes(routes!(stepup::evaluate))
        .routes(routes!(stepup::challenge))
        .routes(routes!(stepup::verify))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    let license_id = env!("CARGO_PKG_LICENSE");
    if !license_id.is_empty() {
        let mut license = License::new(license_id);
        license.identifier = Some(license_id.to_string());
        info.license = Some(license);
    }

    OpenApiBuilder::new().info(info).build()
}

#[cfg(test)]
mod tests {
    use super::openapi;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "auth"));
        assert!(tags.iter().any(|tag| tag.name == "mfa"));

        for path in [
            "/v1/auth/mfa/factors",
            "/v1/auth/mfa/totp/enroll/start",
            "/v1/auth/mfa/totp/enroll/finish",
            "/v1/auth/mfa/totp/enroll/cancel",
            "/v1/auth/mfa/totp/disable",
            "/v1/auth/step-up/evaluate",
            "/v1/auth/step-up/challenge",
            "/v1/auth/step-up/verify",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path: {path}");
        }
    }
}
