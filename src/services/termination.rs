//! Time-based termination rules evaluated out of band by the sweep.

use std::time::{Duration, SystemTime};

use serde_json::Value;

use crate::dao::models::{Side, TerminationDescriptor};

/// Decides whether elapsed time ends a match.
///
/// Implementations must be free of side effects and give the same answer for
/// the same board and clock.
pub trait TerminationPolicy: Send + Sync {
    /// Inspect `board` with `to_move` on the clock at `now`.
    fn decide(&self, board: &Value, to_move: Side, now: SystemTime)
    -> Option<TerminationDescriptor>;
}

/// Per-player chess-clock policy reading its inputs from the board payload.
///
/// Expected fields: `timeControl` (ms per player, `0` means untimed),
/// `redElapsed` / `blueElapsed` (ms already consumed) and `turnStartTime`
/// (epoch ms when the running turn began).
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockPolicy;

impl ClockPolicy {
    fn millis(board: &Value, field: &str) -> Option<u64> {
        board.get(field)?.as_u64()
    }

    fn elapsed_field(side: Side) -> &'static str {
        match side {
            Side::Red => "redElapsed",
            Side::Blue => "blueElapsed",
        }
    }
}

impl TerminationPolicy for ClockPolicy {
    fn decide(
        &self,
        board: &Value,
        to_move: Side,
        now: SystemTime,
    ) -> Option<TerminationDescriptor> {
        let limit = Self::millis(board, "timeControl").filter(|limit| *limit > 0)?;
        let used = Self::millis(board, Self::elapsed_field(to_move)).unwrap_or(0);
        let turn_start = SystemTime::UNIX_EPOCH
            + Duration::from_millis(Self::millis(board, "turnStartTime")?);

        // A turn start in the future (clock skew) counts as no time spent.
        let running = now
            .duration_since(turn_start)
            .unwrap_or(Duration::ZERO)
            .as_millis();

        if u128::from(used) + running >= u128::from(limit) {
            Some(TerminationDescriptor::timeout(to_move))
        } else {
            None
        }
    }
}
