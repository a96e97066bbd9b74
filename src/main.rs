use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, build_app};
use vitals_core::config::{bool_from_env_value, session_ttl_from_env_value};
use vitals_core::{RelayConfig, RelayServices};

/// Main entry point for the vitals relay
///
/// Serves the JSON API and HTML pages on one address (configurable via
/// `VITALS_REST_ADDR`).
///
/// # Environment Variables
/// - `AUTH_SERVER_URL`: authorization server base URL (required)
/// - `FHIR_SERVER_URL`: FHIR server base URL (required)
/// - `CLIENT_ID`: OAuth client id (required)
/// - `REDIRECT_URI`: callback URI registered with the authorization server
/// - `OAUTH_SCOPE`: scope requested at sign-in
/// - `VITALS_REST_ADDR`: server address (default: "0.0.0.0:3000")
/// - `SECURE_COOKIES`: mark the session cookie `Secure` (default: false)
/// - `SESSION_TTL_SECS`: session lifetime in seconds (default: 3600)
/// - `TOKEN_IN_URL`: also put the access token in the post-sign-in redirect (default: false)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vitals_run=info".parse()?)
                .add_directive("vitals_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(config_from_env()?);
    let rest_addr = std::env::var("VITALS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    if cfg.token_in_url() {
        tracing::warn!("TOKEN_IN_URL is enabled: access tokens will appear in redirect URLs");
    }

    tracing::info!("++ Starting vitals relay on {}", rest_addr);
    tracing::info!(
        auth = %cfg.auth_server_url(),
        fhir = %cfg.fhir_server_url(),
        "upstream servers"
    );

    let services = RelayServices::new(cfg)?;
    let app = build_app(AppState::new(services));

    let listener = tokio::net::TcpListener::bind(&rest_addr)
        .await
        .with_context(|| format!("failed to bind {rest_addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn config_from_env() -> anyhow::Result<RelayConfig> {
    let auth_server_url = required_env("AUTH_SERVER_URL")?;
    let fhir_server_url = required_env("FHIR_SERVER_URL")?;
    let client_id = required_env("CLIENT_ID")?;
    let redirect_uri = std::env::var("REDIRECT_URI").ok();
    let scope = std::env::var("OAUTH_SCOPE").ok();

    let cfg = RelayConfig::new(
        &auth_server_url,
        &fhir_server_url,
        client_id,
        redirect_uri.as_deref(),
    )?
    .with_scope(scope.as_deref())
    .with_secure_cookies(bool_from_env_value(
        "SECURE_COOKIES",
        std::env::var("SECURE_COOKIES").ok(),
        false,
    )?)
    .with_session_ttl(session_ttl_from_env_value(
        std::env::var("SESSION_TTL_SECS").ok(),
    )?)
    .with_token_in_url(bool_from_env_value(
        "TOKEN_IN_URL",
        std::env::var("TOKEN_IN_URL").ok(),
        false,
    )?);

    Ok(cfg)
}

fn required_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}
