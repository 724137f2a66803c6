//! Sweep over every non-terminal match, reconciling each one independently.

use futures::{StreamExt, stream};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::{
    error::{ReconcileError, SweepError},
    services::reconciler::{MatchReconciler, ReconcileOutcome, TerminationCause},
};

/// Tally of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Correlation id used in the sweep's log span.
    pub sweep_id: Uuid,
    /// Candidates returned by the listing.
    pub scanned: usize,
    /// Matches that needed no write.
    pub unchanged: usize,
    /// Mirror current-turn player corrections.
    pub turn_player_updates: usize,
    /// Matches that became terminal through abort or policy.
    pub terminated: usize,
    /// Half-applied terminations completed, including metadata synced to a terminal state.
    pub repaired: usize,
    /// Matches whose reconciliation failed.
    pub failed: usize,
    /// Matches not started because shutdown was requested.
    pub skipped: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: &Result<ReconcileOutcome, ReconcileError>) {
        match outcome {
            Ok(ReconcileOutcome::Unchanged) => self.unchanged += 1,
            Ok(ReconcileOutcome::TurnPlayerUpdated) => self.turn_player_updates += 1,
            Ok(ReconcileOutcome::Terminated(TerminationCause::Repaired))
            | Ok(ReconcileOutcome::MetadataSynced) => self.repaired += 1,
            Ok(ReconcileOutcome::Terminated(_)) => self.terminated += 1,
            Err(_) => self.failed += 1,
        }
    }
}

enum Slot {
    Done(Result<ReconcileOutcome, ReconcileError>),
    Skipped,
}

/// Drives one sweep over the mirror's active matches.
pub struct ReconciliationScheduler {
    reconciler: MatchReconciler,
    concurrency: usize,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ReconciliationScheduler {
    /// Sweep with at most `concurrency` matches in flight.
    pub fn new(reconciler: MatchReconciler, concurrency: usize) -> Self {
        Self {
            reconciler,
            concurrency: concurrency.max(1),
            shutdown: None,
        }
    }

    /// Stop starting new matches once `shutdown` flips to `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutting_down(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|shutdown| *shutdown.borrow())
    }

    /// List every non-terminal match and reconcile each one.
    ///
    /// Only the listing can fail the sweep; per-match failures are logged and
    /// counted.
    pub async fn run(&self) -> Result<SweepReport, SweepError> {
        let sweep_id = Uuid::new_v4();
        let span = info_span!("sweep", %sweep_id);
        self.sweep(sweep_id).instrument(span).await
    }

    async fn sweep(&self, sweep_id: Uuid) -> Result<SweepReport, SweepError> {
        let candidates = self
            .reconciler
            .mirror()
            .list_active()
            .await
            .map_err(SweepError::Fatal)?;

        let mut report = SweepReport {
            sweep_id,
            scanned: candidates.len(),
            ..SweepReport::default()
        };

        let mut results = stream::iter(candidates.into_iter().map(|summary| summary.id))
            .map(|match_id| async move {
                // In-flight matches finish; new ones are not started after shutdown.
                if self.shutting_down() {
                    return (match_id, Slot::Skipped);
                }
                let outcome = self.reconciler.reconcile(&match_id).await;
                (match_id, Slot::Done(outcome))
            })
            .buffer_unordered(self.concurrency);

        while let Some((match_id, slot)) = results.next().await {
            match slot {
                Slot::Skipped => report.skipped += 1,
                Slot::Done(outcome) => {
                    if let Err(err) = &outcome {
                        warn!(
                            match_id = %match_id,
                            error = %err,
                            details = ?err,
                            "match reconciliation failed"
                        );
                    }
                    report.record(&outcome);
                }
            }
        }

        info!(
            scanned = report.scanned,
            unchanged = report.unchanged,
            turn_player_updates = report.turn_player_updates,
            terminated = report.terminated,
            repaired = report.repaired,
            failed = report.failed,
            skipped = report.skipped,
            "sweep finished"
        );

        Ok(report)
    }
}
