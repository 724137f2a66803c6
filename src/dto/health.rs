use serde::Serialize;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
}

impl HealthResponse {
    /// Both stores reachable and a game store installed.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// At least one store is unreachable; sweeps are paused.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}
