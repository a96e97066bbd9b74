//! # API REST
//!
//! REST API and HTML pages for the vitals relay.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation
//! - REST-specific concerns (JSON serialisation, cookies, CORS, request tracing)
//!
//! Uses `api-shared` for common types and `vitals-core` for the relays themselves.

#![warn(rust_2018_idioms)]

mod api;
mod error;
mod pages;
mod session_cookie;
pub mod templates;

pub use error::{ApiError, ApiResult};

use api_shared::{ErrorRes, HealthRes};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use vitals_core::RelayServices;

/// Application state for the REST API server
///
/// Contains the relay services shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: RelayServices,
}

impl AppState {
    pub fn new(services: RelayServices) -> Self {
        Self { services }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health,
        api::sign_in,
        api::callback,
        api::sign_out,
        api::create_observation,
        api::read_patient,
    ),
    components(schemas(HealthRes, ErrorRes))
)]
pub struct ApiDoc;

/// Build the router with every route and middleware layer.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api-docs/openapi.json", get(api::openapi))
        .route("/api/auth/signin", get(api::sign_in))
        .route("/api/auth/callback", get(api::callback))
        .route("/api/auth/signout", post(api::sign_out))
        .route("/api/observation/create", post(api::create_observation))
        .route("/api/patient/:patient_id", get(api::read_patient))
        .route("/", get(pages::home))
        .route("/patient/:patient_id", get(pages::patient))
        .route("/patient/:patient_id/observations", post(pages::submit_observation))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
