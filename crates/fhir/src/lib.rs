//! FHIR wire/boundary support for the vitals relay.
//!
//! This crate provides **wire models** and **translation helpers** for the FHIR R4 JSON
//! resources the relay exchanges with an upstream clinical-data server:
//! - Observation payloads built from the vital-sign entry form
//! - OperationOutcome error bodies
//! - search-result Bundles
//! - Patient demographics (display projection only)
//!
//! This crate focuses on:
//! - serialisation/deserialisation
//! - translation between domain primitives and wire structs
//! - local validation before anything is sent upstream
//!
//! It has no HTTP concerns; transport lives in `vitals-core`.

pub mod bundle;
pub mod observation;
pub mod operation_outcome;
pub mod patient;
pub mod vocabulary;

// Re-export facades
pub use bundle::SearchBundle;
pub use observation::{Observation, ObservationDraft, ObservationForm, ObservationQuery};
pub use operation_outcome::{OperationOutcome, OperationOutcomeIssue};
pub use patient::{Patient, PatientSummary};
pub use vocabulary::VitalSign;

/// FHIR media type used for request and response bodies.
pub const FHIR_JSON: &str = "application/fhir+json";

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "Invalid observation data. Required fields: {}",
        observation::REQUIRED_FIELDS.join(", ")
    )]
    MissingRequiredFields(Vec<&'static str>),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
