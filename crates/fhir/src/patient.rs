//! FHIR Patient wire model and display projection.
//!
//! The relay passes Patient resources through unchanged; this module only extracts the
//! handful of fields the patient page shows.
//!
//! Responsibilities:
//! - Define a lenient wire model (upstream Patients carry many more fields)
//! - Validate `resourceType`
//! - Flatten the first name and address into display strings

use crate::FhirError;
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Public domain-level types
// ============================================================================

/// Display projection of a Patient resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientSummary {
    pub id: Option<String>,

    /// First name's `text`, or its given names followed by the family name.
    pub name: Option<String>,

    /// ISO 8601 date (YYYY-MM-DD).
    pub birth_date: Option<String>,

    /// First address's `text`, or its lines, city and postal code.
    pub address: Option<String>,
}

// ============================================================================
// Public Patient operations
// ============================================================================

/// Patient resource operations.
///
/// This is a zero-sized type used for namespacing patient-related operations.
pub struct Patient;

impl Patient {
    /// Project a Patient resource into a [`PatientSummary`].
    ///
    /// Uses `serde_path_to_error` to report the failing field (e.g. `name.0.given`) when the
    /// resource does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - a modelled field has an unexpected type,
    /// - `resourceType` is not `"Patient"`.
    pub fn summarise(resource: &Value) -> Result<PatientSummary, FhirError> {
        let wire = match serde_path_to_error::deserialize::<_, PatientWire>(resource) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Patient schema mismatch at {path}: {source}"
                )));
            }
        };

        if wire.resource_type != "Patient" {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Patient', got '{}'",
                wire.resource_type
            )));
        }

        Ok(wire_to_summary(wire))
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
struct PatientWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    name: Vec<HumanNameWire>,

    #[serde(rename = "birthDate", default)]
    birth_date: Option<String>,

    #[serde(default)]
    address: Vec<AddressWire>,
}

#[derive(Clone, Debug, Deserialize)]
struct HumanNameWire {
    #[serde(default)]
    text: Option<String>,

    #[serde(default)]
    family: Option<String>,

    #[serde(default)]
    given: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct AddressWire {
    #[serde(default)]
    text: Option<String>,

    #[serde(default)]
    line: Vec<String>,

    #[serde(default)]
    city: Option<String>,

    #[serde(rename = "postalCode", default)]
    postal_code: Option<String>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_summary(wire: PatientWire) -> PatientSummary {
    PatientSummary {
        id: non_empty(wire.id),
        name: wire.name.into_iter().next().and_then(name_text),
        birth_date: non_empty(wire.birth_date),
        address: wire.address.into_iter().next().and_then(address_text),
    }
}

fn name_text(name: HumanNameWire) -> Option<String> {
    if let Some(text) = non_empty(name.text) {
        return Some(text);
    }
    let parts: Vec<String> = name.given.into_iter().chain(name.family).collect();
    join_non_empty(parts, " ")
}

fn address_text(address: AddressWire) -> Option<String> {
    if let Some(text) = non_empty(address.text) {
        return Some(text);
    }
    let parts: Vec<String> = address
        .line
        .into_iter()
        .chain(address.city)
        .chain(address.postal_code)
        .collect();
    join_non_empty(parts, ", ")
}

fn join_non_empty(parts: Vec<String>, sep: &str) -> Option<String> {
    let parts: Vec<String> = parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(sep))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summarises_text_fields() {
        let resource = json!({
            "resourceType": "Patient",
            "id": "P1",
            "name": [{"use": "official", "text": "Sarah Jane Williams"}],
            "birthDate": "1992-03-20",
            "address": [{"text": "1 High Street, Leeds"}],
            "telecom": [{"system": "phone", "value": "0113"}]
        });

        let summary = Patient::summarise(&resource).expect("summary");
        assert_eq!(summary.id.as_deref(), Some("P1"));
        assert_eq!(summary.name.as_deref(), Some("Sarah Jane Williams"));
        assert_eq!(summary.birth_date.as_deref(), Some("1992-03-20"));
        assert_eq!(summary.address.as_deref(), Some("1 High Street, Leeds"));
    }

    #[test]
    fn builds_name_and_address_from_parts() {
        let resource = json!({
            "resourceType": "Patient",
            "id": "P2",
            "name": [
                {"family": "Williams", "given": ["Sarah", "Jane"]},
                {"use": "nickname", "given": ["Sally"]}
            ],
            "address": [{"line": ["1 High Street"], "city": "Leeds", "postalCode": "LS1 1AA"}]
        });

        let summary = Patient::summarise(&resource).expect("summary");
        // Only the first name is used
        assert_eq!(summary.name.as_deref(), Some("Sarah Jane Williams"));
        assert_eq!(summary.address.as_deref(), Some("1 High Street, Leeds, LS1 1AA"));
        assert!(summary.birth_date.is_none());
    }

    #[test]
    fn minimal_patient_has_empty_summary() {
        let summary = Patient::summarise(&json!({"resourceType": "Patient"})).expect("summary");
        assert_eq!(summary, PatientSummary::default());
    }

    #[test]
    fn rejects_invalid_resource_type() {
        let err = Patient::summarise(&json!({"resourceType": "NotPatient", "id": "x"}))
            .expect_err("should reject invalid resourceType");
        match err {
            FhirError::InvalidInput(msg) => {
                assert!(msg.contains("Patient"));
                assert!(msg.contains("NotPatient"));
            }
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn reports_path_of_wrong_type() {
        let resource = json!({
            "resourceType": "Patient",
            "name": [{"given": "not_an_array"}]
        });
        let err = Patient::summarise(&resource).expect_err("should reject wrong type");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("given")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }
}
