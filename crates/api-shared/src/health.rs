use crate::types::HealthRes;

/// Simple health service for the REST API.
///
/// This service provides a standardised way to check the health status of the relay.
/// Upstream servers are not contacted.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Check health without creating an instance.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Vitals relay is alive".into(),
        }
    }
}
