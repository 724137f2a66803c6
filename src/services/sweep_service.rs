use tracing::info;

use crate::{
    dto::{admin::ReconcileResponse, format_system_time, presence::PresenceEntry},
    error::ServiceError,
    services::scheduler::SweepReport,
    state::SharedState,
};

/// Run one sweep immediately, outside the timer.
pub async fn run_sweep(state: &SharedState) -> Result<SweepReport, ServiceError> {
    if state.is_degraded() {
        return Err(ServiceError::Degraded);
    }
    let report = state.scheduler().await?.run().await?;
    info!(sweep_id = %report.sweep_id, "manual sweep completed");
    Ok(report)
}

/// Reconcile a single match by identifier.
pub async fn reconcile_match(
    state: &SharedState,
    match_id: &str,
) -> Result<ReconcileResponse, ServiceError> {
    if state.is_degraded() {
        return Err(ServiceError::Degraded);
    }
    let outcome = state.reconciler().await?.reconcile(match_id).await?;
    info!(match_id, ?outcome, "manual reconciliation completed");
    Ok(ReconcileResponse {
        match_id: match_id.to_owned(),
        outcome,
    })
}

/// Every player identity seen connected, with the time of the last observation.
pub fn presence_entries(state: &SharedState) -> Vec<PresenceEntry> {
    state
        .presence()
        .snapshot()
        .into_iter()
        .map(|(identity, at)| PresenceEntry {
            identity,
            last_seen: format_system_time(at),
        })
        .collect()
}
