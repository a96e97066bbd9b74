//! HTML pages for signing in and entering observations.

use crate::session_cookie::session_id;
use crate::templates::{self, StatusLine};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Form,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use fhir::ObservationForm;
use serde::Deserialize;
use vitals_core::{Credentials, RelayError};

/// Query parameters read in legacy token-in-URL mode.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LegacyQuery {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
    #[serde(rename = "patientId")]
    patient_id: Option<String>,
}

impl LegacyQuery {
    fn into_credentials(self, patient_id: Option<&str>) -> Option<Credentials> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        let patient_id = self
            .patient_id
            .or_else(|| patient_id.map(str::to_string))
            .filter(|p| !p.is_empty())?;
        Some(Credentials {
            access_token,
            patient_id,
        })
    }
}

/// Credentials a page acts with.
struct PageCredentials {
    credentials: Credentials,
    /// Query carrying the credentials on to the next page; set only when they came from
    /// the URL.
    link_query: Option<String>,
}

impl PageCredentials {
    fn from_session(credentials: Credentials) -> Self {
        Self {
            credentials,
            link_query: None,
        }
    }

    fn from_url(credentials: Credentials) -> Self {
        let link_query = format!(
            "accessToken={}&patientId={}",
            urlencoding::encode(&credentials.access_token),
            urlencoding::encode(&credentials.patient_id)
        );
        Self {
            credentials,
            link_query: Some(link_query),
        }
    }

    fn link_query(&self) -> Option<&str> {
        self.link_query.as_deref()
    }
}

/// Session credentials, else (legacy mode only) credentials from the query string.
async fn page_credentials(
    state: &AppState,
    jar: &CookieJar,
    query: LegacyQuery,
    patient_id: Option<&str>,
) -> Option<PageCredentials> {
    if let Some(credentials) = state
        .services
        .authorisation
        .credentials(session_id(jar))
        .await
    {
        return Some(PageCredentials::from_session(credentials));
    }
    if state.services.cfg.token_in_url() {
        return query
            .into_credentials(patient_id)
            .map(PageCredentials::from_url);
    }
    None
}

fn status_text(status: StatusCode) -> String {
    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
}

/// Home page.
pub(crate) async fn home(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LegacyQuery>,
) -> Html<String> {
    let page = page_credentials(&state, &jar, query, None).await;
    let form = ObservationForm::with_defaults(Utc::now());
    Html(templates::render_home(
        page.as_ref().map(|p| p.credentials.patient_id.as_str()),
        page.as_ref().and_then(PageCredentials::link_query),
        &form,
    ))
}

/// Patient page: demographics table and observation form.
pub(crate) async fn patient(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(patient_id): Path<String>,
    Query(query): Query<LegacyQuery>,
) -> Html<String> {
    let page = page_credentials(&state, &jar, query, Some(patient_id.as_str())).await;
    let Some(page) = page else {
        return Html(templates::render_signed_out());
    };

    let form = ObservationForm::with_defaults(Utc::now());
    let summary = state
        .services
        .patients
        .summary(Some(&page.credentials.access_token), &patient_id)
        .await;

    let links = page.link_query();
    let html = match &summary {
        Ok(summary) => templates::render_patient(&patient_id, links, Ok(summary), &form, None),
        Err(err) => {
            tracing::warn!(patient = %patient_id, "patient fetch failed: {err}");
            let message = err.to_string();
            templates::render_patient(&patient_id, links, Err(message.as_str()), &form, None)
        }
    };
    Html(html)
}

/// Observation form submission.
///
/// Input is validated before anything is sent upstream; the outcome is shown above the
/// form, which keeps the submitted values.
pub(crate) async fn submit_observation(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(patient_id): Path<String>,
    Query(query): Query<LegacyQuery>,
    Form(form): Form<ObservationForm>,
) -> Html<String> {
    let page = page_credentials(&state, &jar, query, Some(patient_id.as_str())).await;
    let Some(page) = page else {
        return Html(templates::render_signed_out());
    };

    let status = match state
        .services
        .observations
        .submit_form(&page.credentials.access_token, &form, &patient_id)
        .await
    {
        Ok(created) => StatusLine::Success {
            status: status_text(created.status),
            id: created.id().map(str::to_string),
        },
        Err(RelayError::InvalidForm(err)) => StatusLine::Error(err.to_string()),
        Err(err) => StatusLine::Error(format!("{}: {err}", status_text(err.status_code()))),
    };

    Html(templates::render_submission(
        &patient_id,
        page.link_query(),
        &form,
        &status,
    ))
}
