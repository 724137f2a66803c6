use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe both stores and report whether sweeps can currently run.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let mut healthy = true;

    if let Err(err) = state.mirror().health_check().await {
        warn!(error = %err, "mirror health check failed");
        healthy = false;
    }

    match state.game_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "game store health check failed");
                healthy = false;
            }
        }
        None => {
            warn!("game store unavailable (degraded mode)");
            healthy = false;
        }
    }

    if healthy && !state.is_degraded() {
        HealthResponse::ok()
    } else {
        HealthResponse::degraded()
    }
}
