//! FHIR OperationOutcome, as returned by upstream servers on failure.
//!
//! Only the parts needed to surface a readable message are modelled; unknown keys are
//! ignored.

use serde::{Deserialize, Serialize};

/// Placeholder used when an issue carries no diagnostics text.
pub const NO_DIAGNOSTICS: &str = "No diagnostics provided";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct OperationOutcome {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(default)]
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct OperationOutcomeIssue {
    /// fatal | error | warning | information
    #[serde(default)]
    pub severity: String,

    #[serde(default)]
    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl OperationOutcome {
    /// Parse `body` as an OperationOutcome.
    ///
    /// Returns `None` when the body is not JSON or its `resourceType` is anything else.
    pub fn from_slice(body: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Self>(body)
            .ok()
            .filter(|outcome| outcome.resource_type == "OperationOutcome")
    }

    /// Each issue's diagnostics (or [`NO_DIAGNOSTICS`]) joined with `", "`.
    pub fn diagnostics_summary(&self) -> String {
        self.issue
            .iter()
            .map(|issue| {
                issue
                    .diagnostics
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .unwrap_or(NO_DIAGNOSTICS)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_issue_diagnostics() {
        let body = br#"{
            "resourceType": "OperationOutcome",
            "issue": [
                {"severity": "error", "code": "invalid", "diagnostics": "A"},
                {"severity": "error", "code": "required", "diagnostics": "B"}
            ]
        }"#;
        let outcome = OperationOutcome::from_slice(body).expect("outcome");
        assert_eq!(outcome.issue.len(), 2);
        assert_eq!(outcome.diagnostics_summary(), "A, B");
    }

    #[test]
    fn placeholder_for_missing_diagnostics() {
        let body = br#"{
            "resourceType": "OperationOutcome",
            "issue": [{"severity": "error", "code": "processing"}],
            "text": {"status": "generated"}
        }"#;
        let outcome = OperationOutcome::from_slice(body).expect("outcome");
        assert_eq!(outcome.diagnostics_summary(), NO_DIAGNOSTICS);
    }

    #[test]
    fn ignores_other_resources_and_non_json() {
        assert!(OperationOutcome::from_slice(br#"{"resourceType": "Patient"}"#).is_none());
        assert!(OperationOutcome::from_slice(b"<html>Bad Gateway</html>").is_none());
        assert!(OperationOutcome::from_slice(b"").is_none());
    }
}
