//! Per-match mutual exclusion so only one reconciliation touches a match at a time.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-match async mutexes.
///
/// Entries are created on demand and dropped again once nobody holds or waits
/// for them, so the map only grows with the number of matches in flight.
#[derive(Debug, Default)]
pub struct MatchLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive right to reconcile one match; releases on drop.
pub struct MatchGuard<'a> {
    registry: &'a MatchLocks,
    match_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl MatchLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `match_id` is free and take it.
    pub async fn acquire(&self, match_id: &str) -> MatchGuard<'_> {
        let lock = self
            .locks
            .entry(match_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let guard = lock.lock_owned().await;
        MatchGuard {
            registry: self,
            match_id: match_id.to_owned(),
            guard: Some(guard),
        }
    }

    /// Number of matches with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no match currently has a lock entry.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for MatchGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex first so its Arc is only held by the map and by waiters.
        self.guard.take();
        // Waiters clone the Arc while holding the shard lock, so a count of one
        // under that same lock means nobody else can reach this entry.
        self.registry
            .locks
            .remove_if(&self.match_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    #[tokio::test]
    async fn same_match_is_serialized() {
        let locks = Arc::new(MatchLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let active = active.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire("m1").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_matches_do_not_block_each_other() {
        let locks = MatchLocks::new();
        let first = locks.acquire("m1").await;
        let second = tokio::time::timeout(Duration::from_secs(1), locks.acquire("m2")).await;

        assert!(second.is_ok());
        assert_eq!(locks.len(), 2);
        drop(first);
        drop(second);
        assert!(locks.is_empty());
    }
}
