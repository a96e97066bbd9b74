//! Upstream error normalisation.
//!
//! Every relay turns a failed upstream response into a [`RelayError::Upstream`] through
//! [`normalise_upstream_error`], so callers see the same message policy no matter which
//! endpoint failed.

use crate::RelayError;
use fhir::OperationOutcome;
use reqwest::StatusCode;
use serde::Deserialize;

/// OAuth 2.0 error response (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Map a non-2xx upstream response to a structured error carrying the upstream status.
///
/// The message is taken from, in order:
/// 1. an OperationOutcome body: each issue's diagnostics joined with `", "`,
/// 2. an OAuth error body: `error` and `error_description`,
/// 3. otherwise the status code and its reason phrase.
pub fn normalise_upstream_error(status: StatusCode, body: &[u8]) -> RelayError {
    let message = if let Some(outcome) = OperationOutcome::from_slice(body) {
        format!("FHIR server error: {}", outcome.diagnostics_summary())
    } else if let Ok(oauth) = serde_json::from_slice::<OAuthErrorBody>(body) {
        match oauth.error_description.filter(|d| !d.is_empty()) {
            Some(description) => {
                format!("Authorization server error: {}: {description}", oauth.error)
            }
            None => format!("Authorization server error: {}", oauth.error),
        }
    } else {
        format!(
            "Unexpected error from upstream server: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        )
    };

    RelayError::Upstream { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_of(err: RelayError) -> (StatusCode, String) {
        match err {
            RelayError::Upstream { status, message } => (status, message),
            other => panic!("expected Upstream error, got {other:?}"),
        }
    }

    #[test]
    fn operation_outcome_diagnostics_are_joined() {
        let body = br#"{"resourceType":"OperationOutcome","issue":[
            {"severity":"error","code":"invalid","diagnostics":"A"},
            {"severity":"error","code":"invalid","diagnostics":"B"}]}"#;
        let (status, message) =
            message_of(normalise_upstream_error(StatusCode::UNPROCESSABLE_ENTITY, body));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(message, "FHIR server error: A, B");
    }

    #[test]
    fn oauth_error_body() {
        let body = br#"{"error":"invalid_grant","error_description":"code expired"}"#;
        let (status, message) = message_of(normalise_upstream_error(StatusCode::BAD_REQUEST, body));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Authorization server error: invalid_grant: code expired");

        let (_, message) = message_of(normalise_upstream_error(
            StatusCode::UNAUTHORIZED,
            br#"{"error":"invalid_client"}"#,
        ));
        assert_eq!(message, "Authorization server error: invalid_client");
    }

    #[test]
    fn unknown_shape_uses_reason_phrase() {
        let (status, message) =
            message_of(normalise_upstream_error(StatusCode::BAD_GATEWAY, b"<html>oops</html>"));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(message, "Unexpected error from upstream server: 502 Bad Gateway");
    }

    #[test]
    fn empty_body_uses_reason_phrase() {
        let (_, message) = message_of(normalise_upstream_error(StatusCode::NOT_FOUND, b""));
        assert_eq!(message, "Unexpected error from upstream server: 404 Not Found");
    }
}
