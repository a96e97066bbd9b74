//! HTTP clients for the upstream authorization and FHIR servers.
//!
//! Upstream calls never fail on a non-2xx status: every response is read in full into an
//! [`UpstreamResponse`] and inspected by the calling relay, so error bodies can be parsed
//! rather than discarded. Only transport failures surface as [`RelayError::Transport`].

use crate::config::RelayConfig;
use crate::constants::USER_AGENT;
use crate::outcome::normalise_upstream_error;
use crate::{RelayError, RelayResult};
use fhir::{ObservationQuery, FHIR_JSON};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Build the shared HTTP client.
///
/// No request timeout is set; calls run to completion or transport failure.
pub fn http_client() -> RelayResult<reqwest::Client> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

/// A fully read upstream response.
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// `Location` header, when present and valid UTF-8.
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    async fn read(response: reqwest::Response) -> RelayResult<Self> {
        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        tracing::debug!(status = %status, bytes = body.len(), "upstream response");

        Ok(Self {
            status,
            location,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> RelayResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Normalise this (non-2xx) response into a [`RelayError::Upstream`].
    pub fn into_error(self) -> RelayError {
        normalise_upstream_error(self.status, &self.body)
    }
}

/// Client for the authorization server's token endpoint.
#[derive(Clone, Debug)]
pub struct AuthServerClient {
    http: reqwest::Client,
    cfg: Arc<RelayConfig>,
}

impl AuthServerClient {
    pub fn new(http: reqwest::Client, cfg: Arc<RelayConfig>) -> Self {
        Self { http, cfg }
    }

    /// Exchange an authorization code at `{auth}/token` (form-encoded).
    pub async fn exchange_code(&self, code: &str, state: &str) -> RelayResult<UpstreamResponse> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.cfg.redirect_uri()),
            ("client_id", self.cfg.client_id()),
            ("state", state),
        ];

        let response = self
            .http
            .post(self.cfg.token_endpoint()?)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        UpstreamResponse::read(response).await
    }
}

/// Client for the FHIR server, attaching the caller's bearer token to every request.
#[derive(Clone, Debug)]
pub struct FhirClient {
    http: reqwest::Client,
    cfg: Arc<RelayConfig>,
}

impl FhirClient {
    pub fn new(http: reqwest::Client, cfg: Arc<RelayConfig>) -> Self {
        Self { http, cfg }
    }

    /// `POST {fhir}/Observation` with `body` forwarded verbatim.
    pub async fn create_observation(
        &self,
        token: &str,
        body: Vec<u8>,
    ) -> RelayResult<UpstreamResponse> {
        let response = self
            .http
            .post(self.cfg.fhir_endpoint(&["Observation"])?)
            .bearer_auth(token)
            .header(CONTENT_TYPE, FHIR_JSON)
            .header(ACCEPT, FHIR_JSON)
            .body(body)
            .send()
            .await?;

        UpstreamResponse::read(response).await
    }

    /// `GET {fhir}/Observation?…` with the filters from `query`.
    pub async fn search_observations(
        &self,
        token: &str,
        query: &ObservationQuery,
    ) -> RelayResult<UpstreamResponse> {
        let response = self
            .http
            .get(self.cfg.fhir_endpoint(&["Observation"])?)
            .query(&query.to_params())
            .bearer_auth(token)
            .header(ACCEPT, FHIR_JSON)
            .send()
            .await?;

        UpstreamResponse::read(response).await
    }

    /// `GET {fhir}/Patient/{id}`.
    pub async fn read_patient(&self, token: &str, patient_id: &str) -> RelayResult<UpstreamResponse> {
        let response = self
            .http
            .get(self.cfg.fhir_endpoint(&["Patient", patient_id])?)
            .bearer_auth(token)
            .header(ACCEPT, FHIR_JSON)
            .send()
            .await?;

        UpstreamResponse::read(response).await
    }
}
