/// PostgREST-style HTTP [`Mirror`].
#[cfg(feature = "rest-mirror")]
pub mod rest;

use futures::future::BoxFuture;

use crate::dao::models::{MatchSummary, PlayerSlot};
use crate::dao::storage::StorageResult;

/// Relational projection of matches used for fast filtering.
pub trait Mirror: Send + Sync {
    /// Summaries of every match whose status is not `GAMEOVER`.
    fn list_active(&self) -> BoxFuture<'static, StorageResult<Vec<MatchSummary>>>;
    /// Summary row for one match, `None` when the row does not exist.
    fn find_summary(
        &self,
        match_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<MatchSummary>>>;
    /// Remote lookup of the slot expected to move, answered from the authoritative state.
    fn current_player_slot(
        &self,
        match_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerSlot>>>;
    /// Overwrite the projected current-turn player of one match.
    fn set_current_turn_player(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap reachability probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
