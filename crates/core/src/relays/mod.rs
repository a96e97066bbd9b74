//! Relay services.
//!
//! Each relay forwards one kind of request to an upstream server and normalises the
//! answer. They share one HTTP client, one configuration and one session store.

pub mod authorisation;
pub mod observation;
pub mod patient;

pub use authorisation::{AuthorisationService, SignIn, SignedIn};
pub use observation::{CreatedObservation, ObservationService};
pub use patient::PatientService;

use crate::config::RelayConfig;
use crate::session::SessionStore;
use crate::upstream::{http_client, AuthServerClient, FhirClient};
use crate::RelayResult;
use std::sync::Arc;

/// All relay services built over shared configuration.
#[derive(Clone, Debug)]
pub struct RelayServices {
    pub cfg: Arc<RelayConfig>,
    pub sessions: SessionStore,
    pub authorisation: AuthorisationService,
    pub observations: ObservationService,
    pub patients: PatientService,
}

impl RelayServices {
    /// Build the services, creating the shared HTTP client and an empty session store.
    pub fn new(cfg: Arc<RelayConfig>) -> RelayResult<Self> {
        let http = http_client()?;
        let sessions = SessionStore::new(cfg.session_ttl());
        let fhir = FhirClient::new(http.clone(), cfg.clone());

        Ok(Self {
            authorisation: AuthorisationService::new(
                cfg.clone(),
                AuthServerClient::new(http, cfg.clone()),
                sessions.clone(),
            ),
            observations: ObservationService::new(fhir.clone()),
            patients: PatientService::new(fhir),
            sessions,
            cfg,
        })
    }
}
