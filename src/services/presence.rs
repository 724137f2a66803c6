//! Process-wide record of when each player was last seen connected to a live match.

use std::time::SystemTime;

use dashmap::DashMap;

/// Last-seen bookkeeping for player identities.
///
/// Updates are last-write-wins; entries are never removed by the reconciler.
pub trait PresenceTracker: Send + Sync {
    /// Record that `identity` was observed connected at `at`.
    fn mark_seen(&self, identity: &str, at: SystemTime);
    /// Last observation of `identity`, if any.
    fn last_seen(&self, identity: &str) -> Option<SystemTime>;
    /// Every known identity with its last observation.
    fn snapshot(&self) -> Vec<(String, SystemTime)>;
}

/// [`PresenceTracker`] kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryPresence {
    seen: DashMap<String, SystemTime>,
}

impl InMemoryPresence {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresenceTracker for InMemoryPresence {
    fn mark_seen(&self, identity: &str, at: SystemTime) {
        self.seen.insert(identity.to_owned(), at);
    }

    fn last_seen(&self, identity: &str) -> Option<SystemTime> {
        self.seen.get(identity).map(|entry| *entry.value())
    }

    fn snapshot(&self) -> Vec<(String, SystemTime)> {
        let mut entries: Vec<_> = self
            .seen
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
