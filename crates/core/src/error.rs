use reqwest::StatusCode;

/// Errors raised by the relay services.
///
/// Every variant maps to exactly one HTTP status via [`RelayError::status_code`]; the
/// `Display` text is the message returned to callers.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("Missing authorization code")]
    MissingAuthorizationCode,
    #[error("Invalid or missing authorization state")]
    InvalidState,

    /// No bearer token on a write request.
    #[error("Missing access token")]
    MissingAccessToken,
    /// No bearer token on a read request.
    #[error("Missing access token")]
    Unauthenticated,

    #[error("{0}")]
    InvalidObservation(#[source] fhir::FhirError),
    #[error("{0}")]
    InvalidForm(#[source] fhir::FhirError),

    #[error("No matching observation found")]
    NoMatchingObservation,

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Fhir(#[from] fhir::FhirError),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingAuthorizationCode
            | RelayError::InvalidState
            | RelayError::MissingAccessToken
            | RelayError::InvalidObservation(_)
            | RelayError::InvalidForm(_) => StatusCode::BAD_REQUEST,
            RelayError::Unauthenticated => StatusCode::UNAUTHORIZED,
            RelayError::NoMatchingObservation => StatusCode::NOT_FOUND,
            RelayError::Upstream { status, .. } => *status,
            RelayError::Config(_)
            | RelayError::Transport(_)
            | RelayError::Json(_)
            | RelayError::Fhir(_)
            | RelayError::Url(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type RelayResult<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_status_depends_on_operation() {
        assert_eq!(
            RelayError::MissingAccessToken.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RelayError::MissingAccessToken.to_string(),
            RelayError::Unauthenticated.to_string()
        );
    }

    #[test]
    fn upstream_status_passes_through() {
        let err = RelayError::Upstream {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "FHIR server error: A, B".into(),
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "FHIR server error: A, B");
    }

    #[test]
    fn invalid_observation_uses_fhir_message() {
        let err = RelayError::InvalidObservation(fhir::FhirError::MissingRequiredFields(vec![
            "encounter",
        ]));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "Invalid observation data. Required fields: code, effectiveDateTime, encounter, valueQuantity"
        );
    }

    #[test]
    fn no_match_is_not_found() {
        assert_eq!(
            RelayError::NoMatchingObservation.status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
