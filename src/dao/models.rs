//! Domain records shared by the GameStore, the Mirror, and the reconciler.

use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a match, shared by both stores.
pub type MatchId = String;

/// Lifecycle status of a match as projected into the Mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    /// Game in progress.
    Active,
    /// Game aborted by an operator or an out-of-band process.
    Aborted,
    /// Game finished; excluded from sweeps.
    Gameover,
}

/// Seat of a player inside a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerSlot {
    /// First seat (`"0"` in the turn context).
    #[serde(rename = "0")]
    Zero,
    /// Second seat (`"1"` in the turn context).
    #[serde(rename = "1")]
    One,
}

impl PlayerSlot {
    /// Parse a slot from its wire representation, either `0`/`1` or `"0"`/`"1"`.
    pub fn from_wire(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => match number.as_u64()? {
                0 => Some(Self::Zero),
                1 => Some(Self::One),
                _ => None,
            },
            Value::String(text) => match text.trim() {
                "0" => Some(Self::Zero),
                "1" => Some(Self::One),
                _ => None,
            },
            _ => None,
        }
    }

    /// Game-rule side played from this slot.
    pub fn side(self) -> Side {
        match self {
            Self::Zero => Side::Red,
            Self::One => Side::Blue,
        }
    }
}

/// Side label the game-rule engine uses for each slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Played from slot 0.
    Red,
    /// Played from slot 1.
    Blue,
}

impl Side {
    /// The opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => f.write_str("RED"),
            Self::Blue => f.write_str("BLUE"),
        }
    }
}

/// Lightweight projection of a match held by the Mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Match identity.
    pub id: MatchId,
    /// Player identifier seated at slot 0.
    pub player0_id: String,
    /// Player identifier seated at slot 1.
    pub player1_id: String,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Player whose turn the Mirror believes it is.
    #[serde(default)]
    pub current_turn_player_id: Option<String>,
    /// Whether the match is played asynchronously.
    #[serde(default)]
    pub is_correspondence: bool,
}

impl MatchSummary {
    /// Player identifier seated at `slot`.
    pub fn player_at(&self, slot: PlayerSlot) -> &str {
        match slot {
            PlayerSlot::Zero => &self.player0_id,
            PlayerSlot::One => &self.player1_id,
        }
    }
}

/// Why a match became terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Aborted from outside the game protocol.
    Aborted,
    /// The side to move ran out of time.
    Timeout,
}

/// Recorded reason and outcome of a terminal match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationDescriptor {
    /// Reason tag.
    pub reason: TerminationReason,
    /// Winning side, when the termination resolves in someone's favour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
}

impl TerminationDescriptor {
    /// Descriptor recorded for an aborted match.
    pub fn aborted() -> Self {
        Self {
            reason: TerminationReason::Aborted,
            winner: None,
        }
    }

    /// Descriptor recorded when `loser` runs out of time.
    pub fn timeout(loser: Side) -> Self {
        Self {
            reason: TerminationReason::Timeout,
            winner: Some(loser.opponent()),
        }
    }
}

/// Turn bookkeeping stored alongside the board payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnContext {
    /// Slot expected to move.
    pub current_player: PlayerSlot,
    /// Number of turns played so far.
    pub turn: u32,
    /// Termination descriptor; `None` while the game is ongoing.
    #[serde(default)]
    pub gameover: Option<TerminationDescriptor>,
}

/// Authoritative, versioned game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    /// Incremented on every write.
    pub version: u64,
    /// Board payload owned by the game-rule engine.
    pub board: Value,
    /// Turn bookkeeping.
    pub ctx: TurnContext,
}

/// Connection record of a single seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConnection {
    /// Player identity, absent for an empty seat.
    #[serde(default)]
    pub identity: Option<String>,
    /// Display name shown to other players.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Whether the player currently holds a live connection.
    #[serde(default)]
    pub connected: bool,
}

/// Authoritative per-match metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchMetadata {
    /// One record per seat.
    pub players: Vec<PlayerConnection>,
    /// Mirrors [`TurnContext::gameover`].
    #[serde(default)]
    pub gameover: Option<TerminationDescriptor>,
    /// Last time the metadata was written.
    pub updated_at: SystemTime,
}

/// State and metadata fetched together for one match.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMatch {
    /// Authoritative state.
    pub state: MatchState,
    /// Authoritative metadata.
    pub metadata: MatchMetadata,
}
