//! In-memory collaborators shared by unit tests.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    io,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime},
};

use futures::future::{BoxFuture, ready};
use serde_json::{Value, json};

use crate::{
    dao::{
        game_store::GameStore,
        mirror::Mirror,
        models::{
            MatchMetadata, MatchState, MatchStatus, MatchSummary, PlayerConnection, PlayerSlot,
            Side, StoredMatch, TerminationDescriptor, TurnContext,
        },
        storage::{StorageError, StorageResult},
    },
    services::{
        notifier::{GameEnd, GameEndNotifier},
        termination::TerminationPolicy,
    },
};

fn offline(what: &str) -> StorageError {
    StorageError::unavailable(what.to_owned(), io::Error::other("injected failure"))
}

/// Mirror row for players `p0` / `p1` with no current-turn player recorded.
pub fn summary(id: &str, status: MatchStatus, is_correspondence: bool) -> MatchSummary {
    MatchSummary {
        id: id.to_owned(),
        player0_id: "p0".into(),
        player1_id: "p1".into(),
        status,
        current_turn_player_id: None,
        is_correspondence,
    }
}

/// Ongoing match at `version` with slot 0 to move and nobody connected.
pub fn live_match(version: u64) -> StoredMatch {
    StoredMatch {
        state: MatchState {
            version,
            board: json!({"pieces": ["a1"]}),
            ctx: TurnContext {
                current_player: PlayerSlot::Zero,
                turn: 3,
                gameover: None,
            },
        },
        metadata: MatchMetadata {
            players: vec![
                PlayerConnection {
                    identity: Some("p0".into()),
                    display_name: None,
                    connected: false,
                },
                PlayerConnection {
                    identity: Some("p1".into()),
                    display_name: None,
                    connected: false,
                },
            ],
            gameover: None,
            updated_at: SystemTime::UNIX_EPOCH,
        },
    }
}

#[derive(Default)]
pub struct FakeGameStore {
    matches: Mutex<HashMap<String, StoredMatch>>,
    fetches: AtomicUsize,
    state_writes: AtomicUsize,
    metadata_writes: AtomicUsize,
    fail_state: AtomicBool,
    fail_metadata: AtomicBool,
    fail_fetch: Mutex<HashSet<String>>,
    fetch_delay: Mutex<Option<Duration>>,
}

impl FakeGameStore {
    pub fn insert(&self, match_id: &str, stored: StoredMatch) {
        self.matches
            .lock()
            .unwrap()
            .insert(match_id.to_owned(), stored);
    }

    pub fn get(&self, match_id: &str) -> Option<StoredMatch> {
        self.matches.lock().unwrap().get(match_id).cloned()
    }

    pub fn fail_fetch(&self, match_id: &str) {
        self.fail_fetch.lock().unwrap().insert(match_id.to_owned());
    }

    pub fn fail_state_writes(&self, fail: bool) {
        self.fail_state.store(fail, Ordering::SeqCst);
    }

    pub fn fail_metadata_writes(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    /// Answer fetches only after `delay`, with the snapshot taken at call time.
    pub fn delay_fetches(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn state_writes(&self) -> usize {
        self.state_writes.load(Ordering::SeqCst)
    }

    pub fn metadata_writes(&self) -> usize {
        self.metadata_writes.load(Ordering::SeqCst)
    }
}

impl GameStore for FakeGameStore {
    fn fetch(&self, match_id: &str) -> BoxFuture<'static, StorageResult<Option<StoredMatch>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_fetch.lock().unwrap().contains(match_id) {
            Err(offline("fetch"))
        } else {
            Ok(self.get(match_id))
        };
        match *self.fetch_delay.lock().unwrap() {
            Some(delay) => Box::pin(async move {
                tokio::time::sleep(delay).await;
                result
            }),
            None => Box::pin(ready(result)),
        }
    }

    fn set_state(&self, match_id: &str, state: MatchState) -> BoxFuture<'static, StorageResult<()>> {
        let result = if self.fail_state.load(Ordering::SeqCst) {
            Err(offline("set_state"))
        } else {
            self.state_writes.fetch_add(1, Ordering::SeqCst);
            if let Some(stored) = self.matches.lock().unwrap().get_mut(match_id) {
                stored.state = state;
            }
            Ok(())
        };
        Box::pin(ready(result))
    }

    fn set_metadata(
        &self,
        match_id: &str,
        metadata: MatchMetadata,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let result = if self.fail_metadata.load(Ordering::SeqCst) {
            Err(offline("set_metadata"))
        } else {
            self.metadata_writes.fetch_add(1, Ordering::SeqCst);
            if let Some(stored) = self.matches.lock().unwrap().get_mut(match_id) {
                stored.metadata = metadata;
            }
            Ok(())
        };
        Box::pin(ready(result))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }
}

#[derive(Default)]
pub struct FakeMirror {
    summaries: Mutex<BTreeMap<String, MatchSummary>>,
    slots: Mutex<HashMap<String, Option<PlayerSlot>>>,
    turn_writes: Mutex<Vec<(String, String)>>,
    fail_list: AtomicBool,
    fail_find: Mutex<HashSet<String>>,
    fail_slot: Mutex<HashSet<String>>,
}

impl FakeMirror {
    pub fn insert(&self, summary: MatchSummary) {
        self.summaries
            .lock()
            .unwrap()
            .insert(summary.id.clone(), summary);
    }

    pub fn set_slot(&self, match_id: &str, slot: Option<PlayerSlot>) {
        self.slots
            .lock()
            .unwrap()
            .insert(match_id.to_owned(), slot);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_find(&self, match_id: &str) {
        self.fail_find.lock().unwrap().insert(match_id.to_owned());
    }

    pub fn fail_slot(&self, match_id: &str) {
        self.fail_slot.lock().unwrap().insert(match_id.to_owned());
    }

    pub fn turn_writes(&self) -> Vec<(String, String)> {
        self.turn_writes.lock().unwrap().clone()
    }
}

impl Mirror for FakeMirror {
    fn list_active(&self) -> BoxFuture<'static, StorageResult<Vec<MatchSummary>>> {
        let result = if self.fail_list.load(Ordering::SeqCst) {
            Err(offline("list_active"))
        } else {
            Ok(self
                .summaries
                .lock()
                .unwrap()
                .values()
                .filter(|summary| summary.status != MatchStatus::Gameover)
                .cloned()
                .collect())
        };
        Box::pin(ready(result))
    }

    fn find_summary(
        &self,
        match_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<MatchSummary>>> {
        let result = if self.fail_find.lock().unwrap().contains(match_id) {
            Err(offline("find_summary"))
        } else {
            Ok(self.summaries.lock().unwrap().get(match_id).cloned())
        };
        Box::pin(ready(result))
    }

    fn current_player_slot(
        &self,
        match_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerSlot>>> {
        let result = if self.fail_slot.lock().unwrap().contains(match_id) {
            Err(offline("current_player_slot"))
        } else {
            Ok(self.slots.lock().unwrap().get(match_id).copied().flatten())
        };
        Box::pin(ready(result))
    }

    fn set_current_turn_player(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<()>> {
        if let Some(summary) = self.summaries.lock().unwrap().get_mut(match_id) {
            summary.current_turn_player_id = Some(player_id.to_owned());
        }
        self.turn_writes
            .lock()
            .unwrap()
            .push((match_id.to_owned(), player_id.to_owned()));
        Box::pin(ready(Ok(())))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }
}

/// Policy answering with a fixed decision and counting its calls.
pub struct FixedPolicy {
    decision: Option<TerminationDescriptor>,
    calls: AtomicUsize,
    last_side: Mutex<Option<Side>>,
}

impl FixedPolicy {
    pub fn none() -> Self {
        Self {
            decision: None,
            calls: AtomicUsize::new(0),
            last_side: Mutex::new(None),
        }
    }

    pub fn returning(descriptor: TerminationDescriptor) -> Self {
        Self {
            decision: Some(descriptor),
            ..Self::none()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_side(&self) -> Option<Side> {
        *self.last_side.lock().unwrap()
    }
}

impl TerminationPolicy for FixedPolicy {
    fn decide(
        &self,
        _board: &Value,
        to_move: Side,
        _now: SystemTime,
    ) -> Option<TerminationDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_side.lock().unwrap() = Some(to_move);
        self.decision.clone()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<GameEnd>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn events(&self) -> Vec<GameEnd> {
        self.events.lock().unwrap().clone()
    }
}

impl GameEndNotifier for RecordingNotifier {
    fn notify_game_end(&self, event: GameEnd) {
        self.events.lock().unwrap().push(event);
    }
}
