use api_shared::ErrorRes;
use axum::response::{IntoResponse, Json, Response};
use vitals_core::RelayError;

/// Relay error rendered as `{"error": message}` with its mapped status.
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, "request failed: {:?}", self.0);
        } else {
            tracing::warn!(status = %status, "request rejected: {}", self.0);
        }

        (status, Json(ErrorRes::new(self.0.to_string()))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
