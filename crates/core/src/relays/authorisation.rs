//! Authorisation-code sign-in.
//!
//! The browser is sent to the authorization server with a per-attempt `state` nonce held
//! in its session. On return, the nonce is checked and consumed, the one-time code is
//! exchanged for an access token and patient id, and those are stored in the session so
//! later same-session requests can use them.

use crate::config::RelayConfig;
use crate::constants::{ACCESS_TOKEN_QUERY_PARAM, PATIENT_VIEW_PATH};
use crate::session::{Credentials, SessionStore};
use crate::upstream::AuthServerClient;
use crate::{RelayError, RelayResult};
use serde::Deserialize;
use std::sync::Arc;
use url::form_urlencoded::byte_serialize;
use url::Url;
use uuid::Uuid;

/// Token endpoint success body. Standard OAuth fields beyond these are ignored.
#[derive(Debug, Deserialize)]
struct TokenResponseWire {
    access_token: String,
    patient: String,
}

/// A started sign-in.
#[derive(Clone, Debug)]
pub struct SignIn {
    pub session_id: Uuid,
    pub authorize_url: Url,
}

/// A completed sign-in.
#[derive(Clone, Debug)]
pub struct SignedIn {
    pub session_id: Uuid,
    pub credentials: Credentials,
    /// Where to send the browser next.
    pub redirect_to: String,
}

/// Drives the authorisation-code flow against the configured authorization server.
#[derive(Clone, Debug)]
pub struct AuthorisationService {
    cfg: Arc<RelayConfig>,
    client: AuthServerClient,
    sessions: SessionStore,
}

impl AuthorisationService {
    pub fn new(cfg: Arc<RelayConfig>, client: AuthServerClient, sessions: SessionStore) -> Self {
        Self {
            cfg,
            client,
            sessions,
        }
    }

    /// Authorization URL for the given state nonce.
    pub fn authorize_url(&self, state: &str) -> RelayResult<Url> {
        let mut url = self.cfg.authorize_endpoint()?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", self.cfg.client_id())
            .append_pair("redirect_uri", self.cfg.redirect_uri())
            .append_pair("scope", self.cfg.scope())
            .append_pair("state", state);
        Ok(url)
    }

    /// Start a sign-in: store a fresh state nonce in the (possibly new) session.
    pub async fn begin_sign_in(&self, existing: Option<Uuid>) -> RelayResult<SignIn> {
        let (session_id, state) = self.sessions.begin_sign_in(existing).await;
        let authorize_url = self.authorize_url(&state)?;

        tracing::info!(session = %session_id, "redirecting to authorization server");

        Ok(SignIn {
            session_id,
            authorize_url,
        })
    }

    /// Handle the authorization server's redirect back to the relay.
    ///
    /// # Errors
    ///
    /// - [`RelayError::MissingAuthorizationCode`] if `code` is absent or empty,
    /// - [`RelayError::InvalidState`] if there is no live session, no pending nonce, or
    ///   `state` does not match it,
    /// - [`RelayError::Upstream`] if the token endpoint answers non-2xx,
    /// - [`RelayError::Transport`] / [`RelayError::Json`] on network or body failures.
    ///
    /// The first two are raised before the authorization server is contacted.
    pub async fn complete_sign_in(
        &self,
        session_id: Option<Uuid>,
        code: Option<&str>,
        state: Option<&str>,
    ) -> RelayResult<SignedIn> {
        let code = code
            .filter(|c| !c.is_empty())
            .ok_or(RelayError::MissingAuthorizationCode)?;

        let session_id = session_id.ok_or(RelayError::InvalidState)?;
        let expected = self
            .sessions
            .take_pending_state(session_id)
            .await
            .ok_or(RelayError::InvalidState)?;
        let state = state
            .filter(|s| *s == expected)
            .ok_or(RelayError::InvalidState)?;

        let response = self.client.exchange_code(code, state).await?;
        if !response.is_success() {
            let err = response.into_error();
            tracing::error!("Error exchanging authorization code for access token: {err}");
            return Err(err);
        }

        let token: TokenResponseWire = response.json()?;
        let credentials = Credentials {
            access_token: token.access_token,
            patient_id: token.patient,
        };

        if !self
            .sessions
            .complete_sign_in(session_id, credentials.clone())
            .await
        {
            return Err(RelayError::InvalidState);
        }

        tracing::info!(patient = %credentials.patient_id, "sign-in completed");

        Ok(SignedIn {
            session_id,
            redirect_to: self.patient_view_location(&credentials),
            credentials,
        })
    }

    /// End the session, if any.
    pub async fn sign_out(&self, session_id: Option<Uuid>) {
        if let Some(id) = session_id {
            if self.sessions.end(id).await {
                tracing::info!(session = %id, "signed out");
            }
        }
    }

    /// Credentials of a signed-in session.
    pub async fn credentials(&self, session_id: Option<Uuid>) -> Option<Credentials> {
        match session_id {
            Some(id) => self.sessions.credentials(id).await,
            None => None,
        }
    }

    /// Patient view path, with the token appended only in legacy URL mode.
    fn patient_view_location(&self, credentials: &Credentials) -> String {
        let mut location = format!(
            "{PATIENT_VIEW_PATH}/{}",
            urlencoding::encode(&credentials.patient_id)
        );
        if self.cfg.token_in_url() {
            let token: String = byte_serialize(credentials.access_token.as_bytes()).collect();
            location.push_str(&format!("?{ACCESS_TOKEN_QUERY_PARAM}={token}"));
        }
        location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::http_client;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(auth_url: &str, token_in_url: bool) -> (AuthorisationService, SessionStore) {
        let cfg = Arc::new(
            RelayConfig::new(auth_url, "https://fhir.example/R4", "client-1", None)
                .expect("config")
                .with_token_in_url(token_in_url),
        );
        let sessions = SessionStore::new(Duration::from_secs(60));
        let client = AuthServerClient::new(http_client().expect("client"), cfg.clone());
        (
            AuthorisationService::new(cfg, client, sessions.clone()),
            sessions,
        )
    }

    #[test]
    fn authorize_url_carries_fixed_parameters_and_state() {
        let (svc, _) = service("https://auth.example/oauth2", false);
        let url = svc.authorize_url("abc123").expect("url");
        assert_eq!(url.path(), "/oauth2/authorize");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("client_id".into(), "client-1".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://localhost:3000/api/auth/callback".into()
        )));
        assert!(pairs.contains(&(
            "scope".into(),
            "openid patient.read patient/Observation.c".into()
        )));
        assert!(pairs.contains(&("state".into(), "abc123".into())));
    }

    #[tokio::test]
    async fn exchanges_code_with_matching_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=C1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "T", "patient": "P1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (svc, sessions) = service(&server.uri(), false);
        let sign_in = svc.begin_sign_in(None).await.expect("begin");
        let state = sign_in
            .authorize_url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .expect("state param");

        let signed_in = svc
            .complete_sign_in(Some(sign_in.session_id), Some("C1"), Some(&state))
            .await
            .expect("signed in");
        assert_eq!(signed_in.redirect_to, "/patient/P1");
        assert_eq!(
            sessions.credentials(sign_in.session_id).await,
            Some(Credentials {
                access_token: "T".into(),
                patient_id: "P1".into()
            })
        );
    }

    #[tokio::test]
    async fn wrong_state_never_reaches_token_endpoint() {
        let server = MockServer::start().await;
        let (svc, _) = service(&server.uri(), false);
        let sign_in = svc.begin_sign_in(None).await.expect("begin");

        let err = svc
            .complete_sign_in(Some(sign_in.session_id), Some("C1"), Some("forged"))
            .await
            .expect_err("state mismatch");
        assert!(matches!(err, RelayError::InvalidState));

        let err = svc
            .complete_sign_in(None, Some("C1"), Some("forged"))
            .await
            .expect_err("no session");
        assert!(matches!(err, RelayError::InvalidState));

        let err = svc
            .complete_sign_in(Some(sign_in.session_id), None, None)
            .await
            .expect_err("no code");
        assert!(matches!(err, RelayError::MissingAuthorizationCode));

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_endpoint_error_is_normalised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                serde_json::json!({"error": "invalid_grant", "error_description": "code used"}),
            ))
            .mount(&server)
            .await;

        let (svc, sessions) = service(&server.uri(), false);
        let (id, state) = sessions.begin_sign_in(None).await;
        let err = svc
            .complete_sign_in(Some(id), Some("C1"), Some(&state))
            .await
            .expect_err("upstream error");
        assert_eq!(err.status_code(), reqwest::StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("invalid_grant"));
        assert!(sessions.credentials(id).await.is_none());
    }

    #[test]
    fn legacy_mode_puts_token_in_location() {
        let (svc, _) = service("https://auth.example", true);
        let location = svc.patient_view_location(&Credentials {
            access_token: "a b/c".into(),
            patient_id: "P1".into(),
        });
        assert_eq!(location, "/patient/P1?accessToken=a+b%2Fc");
    }
}
