//! Per-match reconciliation: decide what the authoritative store and the mirror
//! need, then perform exactly those writes.
//!
//! Deciding is done by the pure [`plan_correspondence`] and [`plan_live`]
//! functions; [`MatchReconciler`] only gathers their inputs and executes the
//! resulting [`ReconcilePlan`]. Every write is skipped when the stores already
//! agree, so running the same reconciliation twice is a no-op the second time.

use std::{sync::Arc, time::SystemTime};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    dao::{
        game_store::GameStore,
        mirror::Mirror,
        models::{
            MatchMetadata, MatchState, MatchStatus, MatchSummary, PlayerSlot, StoredMatch,
            TerminationDescriptor,
        },
    },
    error::{ReconcileError, WriteTarget},
    services::{
        match_locks::MatchLocks,
        notifier::{GameEnd, GameEndNotifier},
        presence::PresenceTracker,
        termination::TerminationPolicy,
    },
};

/// What drove a match into its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    /// The mirror row was marked aborted.
    Aborted,
    /// The termination policy returned a descriptor.
    Policy,
    /// A previous pass recorded the metadata but not the state; this pass completed it.
    Repaired,
}

/// Writes a reconciliation pass intends to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcilePlan {
    /// Stores already agree.
    Noop,
    /// Point the mirror's current-turn player at `player_id`.
    SetTurnPlayer {
        /// Identifier of the player to move.
        player_id: String,
    },
    /// Copy the state's descriptor into metadata that has not caught up yet.
    ///
    /// The match was already terminal, so nothing is announced.
    SyncMetadata(MatchMetadata),
    /// Record a termination descriptor and announce the game end.
    Terminate(Termination),
}

/// Terminal transition to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Termination {
    /// Why the match ends.
    pub cause: TerminationCause,
    /// State carrying the descriptor, written when `write_state` is set.
    pub state: MatchState,
    /// Metadata carrying the descriptor, written when `write_metadata` is set.
    pub metadata: MatchMetadata,
    /// Whether the state record needs persisting.
    pub write_state: bool,
    /// Whether the metadata record needs persisting.
    pub write_metadata: bool,
}

/// Result of reconciling one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "cause", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Nothing needed to change.
    Unchanged,
    /// The mirror's current-turn player was corrected.
    TurnPlayerUpdated,
    /// Metadata of an already terminal match received the state's descriptor.
    MetadataSynced,
    /// The match became terminal during this pass.
    Terminated(TerminationCause),
}

/// Decide the mirror update for a correspondence match given the slot the
/// authoritative state says is to move.
pub fn plan_correspondence(summary: &MatchSummary, to_move: PlayerSlot) -> ReconcilePlan {
    let expected = summary.player_at(to_move);
    if summary.current_turn_player_id.as_deref() == Some(expected) {
        ReconcilePlan::Noop
    } else {
        ReconcilePlan::SetTurnPlayer {
            player_id: expected.to_owned(),
        }
    }
}

/// Decide the terminal transition, if any, for a live match.
///
/// The state descriptor is the commit point: once it is set the match is
/// terminal and is never announced again, though metadata lagging behind it is
/// brought in line. A descriptor present only in metadata is a termination
/// this service started and did not finish, so the state is completed and the
/// game end announced. Otherwise an aborted mirror status wins over the
/// termination policy.
pub fn plan_live(
    summary: &MatchSummary,
    stored: StoredMatch,
    policy: &dyn TerminationPolicy,
    now: SystemTime,
) -> ReconcilePlan {
    let StoredMatch {
        mut state,
        mut metadata,
    } = stored;

    match (state.ctx.gameover.clone(), metadata.gameover.clone()) {
        (Some(_), Some(_)) => ReconcilePlan::Noop,
        (Some(descriptor), None) => {
            metadata.gameover = Some(descriptor);
            metadata.updated_at = now;
            ReconcilePlan::SyncMetadata(metadata)
        }
        (None, Some(descriptor)) => {
            state.ctx.gameover = Some(descriptor);
            state.version += 1;
            ReconcilePlan::Terminate(Termination {
                cause: TerminationCause::Repaired,
                state,
                metadata,
                write_state: true,
                write_metadata: false,
            })
        }
        (None, None) => {
            let (cause, descriptor) = if summary.status == MatchStatus::Aborted {
                (TerminationCause::Aborted, TerminationDescriptor::aborted())
            } else {
                let to_move = state.ctx.current_player.side();
                match policy.decide(&state.board, to_move, now) {
                    Some(descriptor) => (TerminationCause::Policy, descriptor),
                    None => return ReconcilePlan::Noop,
                }
            };

            state.ctx.gameover = Some(descriptor.clone());
            state.version += 1;
            metadata.gameover = Some(descriptor);
            metadata.updated_at = now;
            ReconcilePlan::Terminate(Termination {
                cause,
                state,
                metadata,
                write_state: true,
                write_metadata: true,
            })
        }
    }
}

/// Identities of the players currently connected to a match.
pub fn connected_identities(metadata: &MatchMetadata) -> impl Iterator<Item = &str> {
    metadata
        .players
        .iter()
        .filter(|player| player.connected)
        .filter_map(|player| player.identity.as_deref())
        .filter(|identity| !identity.is_empty())
}

/// Reconciles single matches against the GameStore and the Mirror.
#[derive(Clone)]
pub struct MatchReconciler {
    game_store: Arc<dyn GameStore>,
    mirror: Arc<dyn Mirror>,
    policy: Arc<dyn TerminationPolicy>,
    presence: Arc<dyn PresenceTracker>,
    notifier: Arc<dyn GameEndNotifier>,
    locks: Arc<MatchLocks>,
    clock: fn() -> SystemTime,
}

impl MatchReconciler {
    /// Wire a reconciler to its collaborators.
    ///
    /// `locks` must be shared by every reconciler of the process so overlapping
    /// sweeps and manual triggers serialize on the same match.
    pub fn new(
        game_store: Arc<dyn GameStore>,
        mirror: Arc<dyn Mirror>,
        policy: Arc<dyn TerminationPolicy>,
        presence: Arc<dyn PresenceTracker>,
        notifier: Arc<dyn GameEndNotifier>,
        locks: Arc<MatchLocks>,
    ) -> Self {
        Self {
            game_store,
            mirror,
            policy,
            presence,
            notifier,
            locks,
            clock: SystemTime::now,
        }
    }

    /// Replace the wall clock used for presence stamps and policy evaluation.
    pub fn with_clock(mut self, clock: fn() -> SystemTime) -> Self {
        self.clock = clock;
        self
    }

    /// Mirror access for callers that need to list candidates.
    pub fn mirror(&self) -> &Arc<dyn Mirror> {
        &self.mirror
    }

    /// Bring one match's stores into agreement.
    ///
    /// Runs under the match's lock, so the "not yet terminal" check and the
    /// terminal writes cannot interleave with another reconciliation of the
    /// same match.
    pub async fn reconcile(&self, match_id: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let _guard = self.locks.acquire(match_id).await;

        let summary = self
            .mirror
            .find_summary(match_id)
            .await
            .map_err(|source| ReconcileError::StoreUnavailable {
                match_id: match_id.to_owned(),
                source,
            })?
            .ok_or_else(|| ReconcileError::NotFound {
                match_id: match_id.to_owned(),
                what: "mirror summary",
            })?;

        let plan = if summary.is_correspondence {
            self.plan_correspondence_match(&summary).await?
        } else {
            self.plan_live_match(&summary).await?
        };

        self.execute(match_id, plan).await
    }

    async fn plan_correspondence_match(
        &self,
        summary: &MatchSummary,
    ) -> Result<ReconcilePlan, ReconcileError> {
        let slot = match self.mirror.current_player_slot(&summary.id).await {
            Ok(Some(slot)) => slot,
            Ok(None) => {
                return Err(ReconcileError::UpstreamUnavailable {
                    match_id: summary.id.clone(),
                    source: None,
                });
            }
            Err(source) => {
                return Err(ReconcileError::UpstreamUnavailable {
                    match_id: summary.id.clone(),
                    source: Some(source),
                });
            }
        };

        Ok(plan_correspondence(summary, slot))
    }

    async fn plan_live_match(
        &self,
        summary: &MatchSummary,
    ) -> Result<ReconcilePlan, ReconcileError> {
        let stored = self
            .game_store
            .fetch(&summary.id)
            .await
            .map_err(|source| ReconcileError::StoreUnavailable {
                match_id: summary.id.clone(),
                source,
            })?
            .ok_or_else(|| ReconcileError::NotFound {
                match_id: summary.id.clone(),
                what: "game state",
            })?;

        let now = (self.clock)();
        for identity in connected_identities(&stored.metadata) {
            self.presence.mark_seen(identity, now);
        }

        if let (Some(in_state), Some(in_metadata)) =
            (&stored.state.ctx.gameover, &stored.metadata.gameover)
        {
            if in_state != in_metadata {
                warn!(
                    match_id = %summary.id,
                    state = ?in_state,
                    metadata = ?in_metadata,
                    "termination descriptors disagree; leaving terminal match untouched"
                );
            }
        }

        Ok(plan_live(summary, stored, self.policy.as_ref(), now))
    }

    async fn execute(
        &self,
        match_id: &str,
        plan: ReconcilePlan,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match plan {
            ReconcilePlan::Noop => {
                debug!(match_id, "match already consistent");
                Ok(ReconcileOutcome::Unchanged)
            }
            ReconcilePlan::SetTurnPlayer { player_id } => {
                self.mirror
                    .set_current_turn_player(match_id, &player_id)
                    .await
                    .map_err(|source| ReconcileError::WriteFailed {
                        match_id: match_id.to_owned(),
                        target: WriteTarget::MirrorTurnPlayer,
                        source,
                    })?;
                info!(match_id, player_id = %player_id, "updated mirror current-turn player");
                Ok(ReconcileOutcome::TurnPlayerUpdated)
            }
            ReconcilePlan::SyncMetadata(metadata) => {
                let gameover = metadata.gameover.clone();
                self.game_store
                    .set_metadata(match_id, metadata)
                    .await
                    .map_err(|source| ReconcileError::WriteFailed {
                        match_id: match_id.to_owned(),
                        target: WriteTarget::GameMetadata,
                        source,
                    })?;
                info!(match_id, gameover = ?gameover, "synced metadata of terminal match");
                Ok(ReconcileOutcome::MetadataSynced)
            }
            ReconcilePlan::Terminate(termination) => self.terminate(match_id, termination).await,
        }
    }

    async fn terminate(
        &self,
        match_id: &str,
        termination: Termination,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Termination {
            cause,
            state,
            metadata,
            write_state,
            write_metadata,
        } = termination;

        // Metadata first: the state descriptor marks the match terminal, so a
        // failure between the two writes leaves a termination the next pass
        // completes and announces.
        if write_metadata {
            self.game_store
                .set_metadata(match_id, metadata)
                .await
                .map_err(|source| ReconcileError::WriteFailed {
                    match_id: match_id.to_owned(),
                    target: WriteTarget::GameMetadata,
                    source,
                })?;
        }
        if write_state {
            self.game_store
                .set_state(match_id, state.clone())
                .await
                .map_err(|source| ReconcileError::WriteFailed {
                    match_id: match_id.to_owned(),
                    target: WriteTarget::GameState,
                    source,
                })?;
        }

        info!(
            match_id,
            cause = ?cause,
            gameover = ?state.ctx.gameover,
            version = state.version,
            "recorded terminal state"
        );

        self.notifier.notify_game_end(GameEnd {
            match_id: match_id.to_owned(),
            board: state.board,
            ctx: state.ctx,
        });

        Ok(ReconcileOutcome::Terminated(cause))
    }
}
