use serde::Serialize;
use utoipa::ToSchema;

/// Whether the room store is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Room store connected and answering.
    Ok,
    /// No room store yet, or the last health ping failed.
    Degraded,
}

/// Body of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Serialized as `"ok"` or `"degraded"`.
    pub status: HealthStatus,
}

impl HealthResponse {
    /// Build the response for the given room store state.
    pub fn new(degraded: bool) -> Self {
        let status = if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };
        Self { status }
    }
}
