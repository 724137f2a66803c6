use serde::Serialize;

use crate::{dao::models::MatchId, services::reconciler::ReconcileOutcome};

/// Result of reconciling one match on demand.
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    /// Match that was reconciled.
    pub match_id: MatchId,
    /// What the reconciliation did.
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
}
