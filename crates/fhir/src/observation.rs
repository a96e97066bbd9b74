//! FHIR Observation payloads for vital-sign entry.
//!
//! Responsibilities:
//! - Validate raw form input into a typed [`ObservationDraft`]
//! - Render a draft as a FHIR Observation JSON resource
//! - Check that an arbitrary JSON body carries the fields the relay requires
//! - Derive the search filters used to find an Observation the server created without
//!   reporting its location
//!
//! Notes:
//! - Form date-times carry no timezone and are interpreted as UTC
//! - Request bodies arriving at the relay are forwarded verbatim; only their required
//!   fields are checked here

use crate::vocabulary::{VitalSign, LOINC_SYSTEM, UCUM_SYSTEM};
use crate::{FhirError, FhirResult};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields an Observation body must carry before it is forwarded upstream.
pub const REQUIRED_FIELDS: [&str; 4] = ["code", "effectiveDateTime", "encounter", "valueQuantity"];

/// Sample encounter pre-filled in the entry form.
pub const DEFAULT_ENCOUNTER_ID: &str = "eqIW.btUCgttCU2sVCsBmIg3";

/// Value pre-filled in the entry form.
pub const DEFAULT_VALUE: &str = "120";

/// Date-time layout shown in the entry form.
pub const FORM_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const ACCEPTED_DATE_TIME_FORMATS: [&str; 2] = [FORM_DATE_TIME_FORMAT, "%Y-%m-%dT%H:%M"];

const OBSERVATION_CATEGORY_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/observation-category";

// ============================================================================
// Public domain-level types
// ============================================================================

/// Raw values submitted by the observation entry form.
///
/// Every field defaults to empty so that missing inputs reach [`ObservationDraft::from_form`]
/// and are reported as validation errors rather than extractor rejections.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ObservationForm {
    #[serde(default)]
    pub code: String,

    #[serde(rename = "effectiveDateTime", default)]
    pub effective_date_time: String,

    #[serde(default)]
    pub encounter: String,

    #[serde(default)]
    pub value: String,
}

impl ObservationForm {
    /// Form pre-filled with the default code, sample encounter and value, timed at `now`.
    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        Self {
            code: VitalSign::default().code().to_string(),
            effective_date_time: now.format(FORM_DATE_TIME_FORMAT).to_string(),
            encounter: DEFAULT_ENCOUNTER_ID.to_string(),
            value: DEFAULT_VALUE.to_string(),
        }
    }
}

/// A validated observation, ready to be rendered as a FHIR resource.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationDraft {
    pub vital_sign: VitalSign,
    pub effective: DateTime<Utc>,
    pub encounter_id: String,
    pub patient_id: String,
    pub value: f64,
}

impl ObservationDraft {
    /// Validate form input for the given patient.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidInput`] if:
    /// - the code is not one of the selectable vital signs,
    /// - the date-time is not a valid calendar timestamp in `YYYY-MM-DD HH:MM` form,
    /// - the encounter or patient id is empty,
    /// - the value does not parse as a finite number.
    pub fn from_form(form: &ObservationForm, patient_id: &str) -> FhirResult<Self> {
        let vital_sign = VitalSign::from_code(&form.code).ok_or_else(|| {
            FhirError::InvalidInput(format!("unsupported observation code '{}'", form.code))
        })?;

        let effective = parse_form_date_time(&form.effective_date_time)?;

        let encounter_id = form.encounter.trim();
        if encounter_id.is_empty() {
            return Err(FhirError::InvalidInput("encounter is required".into()));
        }

        let patient_id = patient_id.trim();
        if patient_id.is_empty() {
            return Err(FhirError::InvalidInput("patient id is required".into()));
        }

        let value = form
            .value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                FhirError::InvalidInput(format!("value '{}' is not a number", form.value))
            })?;

        Ok(Self {
            vital_sign,
            effective,
            encounter_id: encounter_id.to_string(),
            patient_id: patient_id.to_string(),
            value,
        })
    }
}

/// Search filters identifying an Observation by its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservationQuery {
    /// Encounter reference, e.g. `Encounter/E1`.
    pub encounter: String,
    /// Token search value, `system|code` when the coding names a system.
    pub code: String,
    /// Effective date-time exactly as submitted.
    pub date: String,
}

impl ObservationQuery {
    /// Derive filters from an Observation body.
    ///
    /// Returns `None` unless all three filters can be read, so a search never matches
    /// more broadly than the submitted encounter, code and date.
    pub fn from_payload(body: &Value) -> Option<Self> {
        Some(Self {
            encounter: reference_of(body.get("encounter"))?,
            code: code_token_of(body.get("code"))?,
            date: body
                .get("effectiveDateTime")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)?,
        })
    }

    /// Query parameters for a newest-first, single-result search.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("encounter", self.encounter.clone()),
            ("code", self.code.clone()),
            ("date", self.date.clone()),
            ("_sort", "-_lastUpdated".to_string()),
            ("_count", "1".to_string()),
        ]
    }
}

// ============================================================================
// Public Observation operations
// ============================================================================

/// Observation resource operations.
///
/// Zero-sized namespace type; all methods are associated functions.
pub struct Observation;

impl Observation {
    /// Render a validated draft as a FHIR Observation resource.
    ///
    /// `issued` is recorded as the time the observation was made available.
    pub fn render(draft: &ObservationDraft, issued: DateTime<Utc>) -> FhirResult<Value> {
        let wire = draft_to_wire(draft, issued);
        serde_json::to_value(&wire)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise observation: {e}")))
    }

    /// Check that `body` is a JSON object carrying every field in [`REQUIRED_FIELDS`].
    ///
    /// A field counts as missing when it is absent, `null`, `false`, zero or an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::MissingRequiredFields`] listing the missing fields.
    pub fn check_required(body: &Value) -> FhirResult<()> {
        let missing: Vec<&'static str> = match body.as_object() {
            Some(map) => REQUIRED_FIELDS
                .into_iter()
                .filter(|field| !map.get(*field).is_some_and(is_truthy))
                .collect(),
            None => REQUIRED_FIELDS.to_vec(),
        };

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FhirError::MissingRequiredFields(missing))
        }
    }

    /// Extract the logical id from a `Location` header value.
    ///
    /// Accepts relative (`Observation/OBS1`) and absolute locations, and skips a trailing
    /// `_history/{version}` suffix.
    pub fn id_from_location(location: &str) -> Option<String> {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let id = match segments.as_slice() {
            [.., id, "_history", _version] => id,
            [.., id] => id,
            [] => return None,
        };
        Some((*id).to_string())
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Serialize)]
struct ObservationWire {
    #[serde(rename = "resourceType")]
    resource_type: &'static str,
    status: &'static str,
    category: Vec<CodeableConceptWire>,
    code: CodeableConceptWire,
    subject: ReferenceWire,
    encounter: ReferenceWire,
    #[serde(rename = "effectiveDateTime")]
    effective_date_time: String,
    issued: String,
    #[serde(rename = "valueQuantity")]
    value_quantity: QuantityWire,
}

#[derive(Clone, Debug, Serialize)]
struct CodeableConceptWire {
    coding: Vec<CodingWire>,
}

#[derive(Clone, Debug, Serialize)]
struct CodingWire {
    system: &'static str,
    code: &'static str,
    display: &'static str,
}

#[derive(Clone, Debug, Serialize)]
struct ReferenceWire {
    reference: String,
}

#[derive(Clone, Debug, Serialize)]
struct QuantityWire {
    value: f64,
    unit: &'static str,
    system: &'static str,
    code: &'static str,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn draft_to_wire(draft: &ObservationDraft, issued: DateTime<Utc>) -> ObservationWire {
    let vital = draft.vital_sign;
    ObservationWire {
        resource_type: "Observation",
        status: "final",
        category: vec![CodeableConceptWire {
            coding: vec![CodingWire {
                system: OBSERVATION_CATEGORY_SYSTEM,
                code: "vital-signs",
                display: "Vital Signs",
            }],
        }],
        code: CodeableConceptWire {
            coding: vec![CodingWire {
                system: LOINC_SYSTEM,
                code: vital.code(),
                display: vital.display(),
            }],
        },
        subject: ReferenceWire {
            reference: format!("Patient/{}", draft.patient_id),
        },
        encounter: ReferenceWire {
            reference: format!("Encounter/{}", draft.encounter_id),
        },
        effective_date_time: draft.effective.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        issued: issued.to_rfc3339_opts(SecondsFormat::Millis, true),
        value_quantity: QuantityWire {
            value: draft.value,
            unit: vital.unit(),
            system: UCUM_SYSTEM,
            code: vital.unit(),
        },
    }
}

fn parse_form_date_time(input: &str) -> FhirResult<DateTime<Utc>> {
    let input = input.trim();
    ACCEPTED_DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            FhirError::InvalidInput(format!(
                "date and time '{input}' must be a valid timestamp in YYYY-MM-DD HH:MM form"
            ))
        })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn reference_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("reference")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn code_token_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => {
            let coding = map.get("coding")?.as_array()?.first()?;
            let code = coding.get("code")?.as_str().filter(|s| !s.is_empty())?;
            match coding.get("system").and_then(Value::as_str) {
                Some(system) if !system.is_empty() => Some(format!("{system}|{code}")),
                _ => Some(code.to_string()),
            }
        }
        _ => None,
    }
}
