//! JSON API and sign-in redirects.

use crate::error::ApiResult;
use crate::session_cookie::{expired_session_cookie, session_cookie, session_id};
use crate::{ApiDoc, AppState};
use api_shared::{bearer_token, HealthRes, HealthService};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Json, Redirect},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::Value;
use utoipa::OpenApi;

/// Query parameters of the authorization server's redirect back to the relay.
#[derive(Debug, Deserialize)]
pub(crate) struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

/// Bearer token from the `Authorization` header, else the session's token.
async fn request_token(state: &AppState, headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token.to_string());
    }
    state
        .services
        .authorisation
        .credentials(session_id(jar))
        .await
        .map(|c| c.access_token)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint.
///
/// Reports that the relay is running; upstream servers are not contacted.
#[axum::debug_handler]
pub(crate) async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

/// OpenAPI document for the JSON API.
pub(crate) async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    get,
    path = "/api/auth/signin",
    responses(
        (status = 307, description = "Redirect to the authorization server"),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Start sign-in.
///
/// Stores a fresh state nonce in the browser session and redirects to the authorization
/// server's authorize endpoint.
#[axum::debug_handler]
pub(crate) async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Redirect)> {
    let sign_in = state
        .services
        .authorisation
        .begin_sign_in(session_id(&jar))
        .await?;

    let jar = jar.add(session_cookie(sign_in.session_id, &state.services.cfg));
    Ok((jar, Redirect::temporary(sign_in.authorize_url.as_str())))
}

#[utoipa::path(
    get,
    path = "/api/auth/callback",
    params(
        ("code" = Option<String>, Query, description = "One-time authorization code"),
        ("state" = Option<String>, Query, description = "State nonce issued at sign-in")
    ),
    responses(
        (status = 307, description = "Redirect to the patient view"),
        (status = 400, description = "Missing code or invalid state", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Complete sign-in.
///
/// Exchanges the authorization code for an access token and patient id, stores them in
/// the session and redirects to the patient view.
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - `code` is missing,
/// - `state` does not match the nonce issued to this session.
///
/// Upstream failures keep the authorization server's status.
#[axum::debug_handler]
pub(crate) async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<(CookieJar, Redirect)> {
    let signed_in = state
        .services
        .authorisation
        .complete_sign_in(
            session_id(&jar),
            query.code.as_deref(),
            query.state.as_deref(),
        )
        .await?;

    let jar = jar.add(session_cookie(signed_in.session_id, &state.services.cfg));
    Ok((jar, Redirect::temporary(&signed_in.redirect_to)))
}

#[utoipa::path(
    post,
    path = "/api/auth/signout",
    responses(
        (status = 303, description = "Session ended, redirect to the home page")
    )
)]
/// End the session and clear its cookie.
#[axum::debug_handler]
pub(crate) async fn sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    state
        .services
        .authorisation
        .sign_out(session_id(&jar))
        .await;
    (jar.remove(expired_session_cookie()), Redirect::to("/"))
}

#[utoipa::path(
    post,
    path = "/api/observation/create",
    request_body(content = String, description = "FHIR Observation JSON", content_type = "application/json"),
    responses(
        (status = 201, description = "Observation created; body is `{id, ...}`"),
        (status = 400, description = "Missing access token or required fields", body = ErrorRes),
        (status = 404, description = "No matching observation found", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Create an Observation on the FHIR server.
///
/// The body is forwarded unchanged once the token and required fields are present. Any
/// other status comes from the FHIR server.
#[axum::debug_handler]
pub(crate) async fn create_observation(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let token = request_token(&state, &headers, &jar).await;
    let created = state
        .services
        .observations
        .create(token.as_deref(), &body)
        .await?;

    Ok((created.status, Json(created.body)))
}

#[utoipa::path(
    get,
    path = "/api/patient/{patient_id}",
    params(
        ("patient_id" = String, Path, description = "Patient logical id")
    ),
    responses(
        (status = 200, description = "Patient resource as returned by the FHIR server"),
        (status = 401, description = "Missing access token", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Read a Patient from the FHIR server.
#[axum::debug_handler]
pub(crate) async fn read_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let token = request_token(&state, &headers, &jar).await;
    let patient = state
        .services
        .patients
        .read(token.as_deref(), &patient_id)
        .await?;

    Ok(Json(patient))
}
