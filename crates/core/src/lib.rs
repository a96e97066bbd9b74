//! # Vitals Core
//!
//! Relay logic for the vitals data-entry service.
//!
//! This crate sits between the browser-facing HTTP layer and two upstream servers:
//! - an OAuth 2.0 authorization server (authorisation-code sign-in)
//! - a FHIR R4 server (Observation create, Patient read)
//!
//! It owns configuration, the in-memory session store, the upstream HTTP clients and the
//! error policy applied to upstream failures.
//!
//! **No HTTP server concerns**: routing, cookies and HTML rendering belong in `api-rest`.

pub mod config;
pub mod constants;
pub mod error;
pub mod outcome;
pub mod relays;
pub mod session;
pub mod upstream;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use outcome::normalise_upstream_error;
pub use relays::{
    AuthorisationService, CreatedObservation, ObservationService, PatientService,
    RelayServices, SignIn, SignedIn,
};
pub use session::{Credentials, SessionStore};
