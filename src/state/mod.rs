use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{game_store::GameStore, mirror::Mirror},
    error::{ServiceError, SweepError},
    services::{
        match_locks::MatchLocks, notifier::GameEndNotifier, presence::PresenceTracker,
        reconciler::MatchReconciler, scheduler::ReconciliationScheduler,
        termination::TerminationPolicy,
    },
};

/// Reference-counted handle passed to handlers and background tasks.
pub type SharedState = Arc<AppState>;

/// Process-wide collaborators handed to every reconciler.
pub struct Collaborators {
    /// Relational projection store.
    pub mirror: Arc<dyn Mirror>,
    /// Time-based termination rule.
    pub policy: Arc<dyn TerminationPolicy>,
    /// Last-seen tracker fed by live reconciliations.
    pub presence: Arc<dyn PresenceTracker>,
    /// Game-end hook.
    pub notifier: Arc<dyn GameEndNotifier>,
}

/// Central application state: store handles, shared collaborators, and lifecycle flags.
pub struct AppState {
    config: AppConfig,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    collaborators: Collaborators,
    locks: Arc<MatchLocks>,
    degraded: watch::Sender<bool>,
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a game store is installed.
    pub fn new(
        config: AppConfig,
        collaborators: Collaborators,
        shutdown: watch::Receiver<bool>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            game_store: RwLock::new(None),
            collaborators,
            locks: Arc::new(MatchLocks::new()),
            degraded: degraded_tx,
            shutdown,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Relational projection store.
    pub fn mirror(&self) -> &Arc<dyn Mirror> {
        &self.collaborators.mirror
    }

    /// Presence tracker owned by this process.
    pub fn presence(&self) -> &Arc<dyn PresenceTracker> {
        &self.collaborators.presence
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Shutdown signal shared with background tasks.
    pub fn shutdown_watcher(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }

    /// Build a reconciler over the installed game store.
    pub async fn reconciler(&self) -> Result<MatchReconciler, ServiceError> {
        let store = self.game_store().await.ok_or(ServiceError::Degraded)?;
        Ok(MatchReconciler::new(
            store,
            self.collaborators.mirror.clone(),
            self.collaborators.policy.clone(),
            self.collaborators.presence.clone(),
            self.collaborators.notifier.clone(),
            self.locks.clone(),
        ))
    }

    /// Build a sweep scheduler honouring the configured parallelism and the shutdown signal.
    pub async fn scheduler(&self) -> Result<ReconciliationScheduler, SweepError> {
        let reconciler = self
            .reconciler()
            .await
            .map_err(|_| SweepError::Degraded)?;
        Ok(
            ReconciliationScheduler::new(reconciler, self.config.sweep_concurrency)
                .with_shutdown(self.shutdown.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::presence::InMemoryPresence,
        testing::{FakeGameStore, FakeMirror, FixedPolicy, RecordingNotifier},
    };

    fn state() -> (SharedState, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let collaborators = Collaborators {
            mirror: Arc::new(FakeMirror::default()),
            policy: Arc::new(FixedPolicy::none()),
            presence: Arc::new(InMemoryPresence::new()),
            notifier: Arc::new(RecordingNotifier::default()),
        };
        (AppState::new(AppConfig::default(), collaborators, rx), tx)
    }

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let (state, _shutdown) = state();
        assert!(state.is_degraded());
        assert!(matches!(
            state.scheduler().await,
            Err(SweepError::Degraded)
        ));

        state.install_game_store(Arc::new(FakeGameStore::default())).await;
        assert!(!state.is_degraded());
        assert!(state.scheduler().await.is_ok());

        state.clear_game_store().await;
        assert!(state.is_degraded());
    }

    #[tokio::test]
    async fn degraded_watchers_only_see_changes() {
        let (state, _shutdown) = state();
        let mut watcher = state.degraded_watcher();

        state.update_degraded(true);
        assert!(!watcher.has_changed().unwrap());

        state.update_degraded(false);
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
    }
}
