//! Relay runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the relay
//! services behind an `Arc`. Nothing in this crate reads environment variables while
//! handling a request; the binary reads them and hands the raw values to the helpers
//! below.

use crate::constants::{DEFAULT_REDIRECT_URI, DEFAULT_SCOPE, DEFAULT_SESSION_TTL_SECS};
use crate::{RelayError, RelayResult};
use std::time::Duration;
use url::Url;

/// Relay configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    auth_server_url: Url,
    fhir_server_url: Url,
    client_id: String,
    redirect_uri: String,
    scope: String,
    secure_cookies: bool,
    session_ttl: Duration,
    token_in_url: bool,
}

impl RelayConfig {
    /// Create a new `RelayConfig`.
    ///
    /// Scope, cookie, session and token-transport settings start at their defaults; use
    /// the `with_*` methods to override them.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if:
    /// - either base URL is not an absolute `http`/`https` URL,
    /// - `client_id` is empty,
    /// - `redirect_uri` is not an absolute URL.
    pub fn new(
        auth_server_url: &str,
        fhir_server_url: &str,
        client_id: impl Into<String>,
        redirect_uri: Option<&str>,
    ) -> RelayResult<Self> {
        let auth_server_url = parse_base_url("AUTH_SERVER_URL", auth_server_url)?;
        let fhir_server_url = parse_base_url("FHIR_SERVER_URL", fhir_server_url)?;

        let client_id = client_id.into().trim().to_string();
        if client_id.is_empty() {
            return Err(RelayError::Config("CLIENT_ID cannot be empty".into()));
        }

        let redirect_uri = redirect_uri
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_REDIRECT_URI);
        Url::parse(redirect_uri).map_err(|e| {
            RelayError::Config(format!("REDIRECT_URI is not an absolute URL: {e}"))
        })?;

        Ok(Self {
            auth_server_url,
            fhir_server_url,
            client_id,
            redirect_uri: redirect_uri.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            secure_cookies: false,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            token_in_url: false,
        })
    }

    /// Sets the scope requested at sign-in. Blank values keep the default.
    #[must_use]
    pub fn with_scope(mut self, scope: Option<&str>) -> Self {
        if let Some(scope) = scope.map(str::trim).filter(|s| !s.is_empty()) {
            self.scope = scope.to_string();
        }
        self
    }

    /// Marks the session cookie `Secure`.
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Carries the access token in the post-sign-in redirect URL.
    ///
    /// # Warning
    ///
    /// Tokens in URLs leak through browser history and `Referer` headers. This mode only
    /// exists for clients that still read `accessToken` from the query string.
    #[must_use]
    pub fn with_token_in_url(mut self, enabled: bool) -> Self {
        self.token_in_url = enabled;
        self
    }

    pub fn auth_server_url(&self) -> &Url {
        &self.auth_server_url
    }

    pub fn fhir_server_url(&self) -> &Url {
        &self.fhir_server_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn token_in_url(&self) -> bool {
        self.token_in_url
    }

    pub fn authorize_endpoint(&self) -> RelayResult<Url> {
        endpoint(&self.auth_server_url, &["authorize"])
    }

    pub fn token_endpoint(&self) -> RelayResult<Url> {
        endpoint(&self.auth_server_url, &["token"])
    }

    /// FHIR endpoint for the given path segments, e.g. `["Patient", id]`.
    ///
    /// Each segment is percent-encoded, so ids cannot escape their path position.
    pub fn fhir_endpoint(&self, segments: &[&str]) -> RelayResult<Url> {
        endpoint(&self.fhir_server_url, segments)
    }
}

/// Parse a boolean flag from an optional string value.
///
/// `None` or blank returns `default`. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn bool_from_env_value(name: &str, value: Option<String>, default: bool) -> RelayResult<bool> {
    let Some(value) = value.map(|v| v.trim().to_ascii_lowercase()) else {
        return Ok(default);
    };
    match value.as_str() {
        "" => Ok(default),
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(RelayError::Config(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

/// Parse the session lifetime (whole seconds) from an optional string value.
///
/// `None` or blank returns the default lifetime.
pub fn session_ttl_from_env_value(value: Option<String>) -> RelayResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let secs = value
        .map(|v| {
            v.parse::<u64>().map_err(|_| {
                RelayError::Config(format!(
                    "SESSION_TTL_SECS must be a whole number of seconds, got '{v}'"
                ))
            })
        })
        .transpose()?
        .unwrap_or(DEFAULT_SESSION_TTL_SECS);

    Ok(Duration::from_secs(secs))
}

fn parse_base_url(name: &str, value: &str) -> RelayResult<Url> {
    let url = Url::parse(value.trim())
        .map_err(|e| RelayError::Config(format!("{name} is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RelayError::Config(format!(
            "{name} must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}

fn endpoint(base: &Url, segments: &[&str]) -> RelayResult<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| RelayError::Config(format!("{base} cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
