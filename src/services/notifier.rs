//! Game-end notification hook invoked when a match newly becomes terminal.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::dao::models::{MatchId, TurnContext};

/// Final board and turn context of a match that just ended.
#[derive(Debug, Clone, Serialize)]
pub struct GameEnd {
    /// Match that ended.
    pub match_id: MatchId,
    /// Board payload as persisted with the termination descriptor.
    pub board: Value,
    /// Turn context carrying the termination descriptor.
    pub ctx: TurnContext,
}

/// Receives game-end events synchronously from the reconciler.
pub trait GameEndNotifier: Send + Sync {
    /// Called at most once per terminal transition.
    fn notify_game_end(&self, event: GameEnd);
}

impl<F> GameEndNotifier for F
where
    F: Fn(GameEnd) + Send + Sync,
{
    fn notify_game_end(&self, event: GameEnd) {
        self(event)
    }
}

/// Fans game-end events out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<GameEnd>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering up to `capacity` undelivered events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to future game-end events.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEnd> {
        self.tx.subscribe()
    }
}

impl GameEndNotifier for BroadcastNotifier {
    fn notify_game_end(&self, event: GameEnd) {
        if let Err(err) = self.tx.send(event) {
            debug!(match_id = %err.0.match_id, "game end published without subscribers");
        }
    }
}
