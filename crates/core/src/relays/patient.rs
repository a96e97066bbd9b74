use crate::upstream::FhirClient;
use crate::{RelayError, RelayResult};
use fhir::{Patient, PatientSummary};
use serde_json::Value;

/// Reads Patient resources on behalf of a signed-in caller.
#[derive(Clone, Debug)]
pub struct PatientService {
    fhir: FhirClient,
}

impl PatientService {
    pub fn new(fhir: FhirClient) -> Self {
        Self { fhir }
    }

    /// Fetch `Patient/{patient_id}` and return the upstream JSON unchanged.
    ///
    /// A missing token is [`RelayError::Unauthenticated`] and nothing is sent upstream.
    pub async fn read(&self, token: Option<&str>, patient_id: &str) -> RelayResult<Value> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(RelayError::Unauthenticated)?;

        let response = self.fhir.read_patient(token, patient_id).await?;
        if !response.is_success() {
            let err = response.into_error();
            tracing::error!("Error fetching patient data: {err}");
            return Err(err);
        }

        response.json()
    }

    /// Fetch a patient and project it for display.
    pub async fn summary(&self, token: Option<&str>, patient_id: &str) -> RelayResult<PatientSummary> {
        let resource = self.read(token, patient_id).await?;
        Ok(Patient::summarise(&resource)?)
    }
}
