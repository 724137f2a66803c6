use std::{future::Future, sync::Arc, time::Duration};

use tokio::{sync::watch, time::sleep};
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Sleep for `duration` unless shutdown is requested first; returns `false` on shutdown.
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = sleep(duration) => true,
        changed = shutdown.changed() => changed.is_ok() && !*shutdown.borrow(),
    }
}

/// Connect the game store, keep both stores under health watch, and hold the
/// service in degraded mode while either one is unreachable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut shutdown = state.shutdown_watcher();
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "game store connection attempt failed");
                if !pause(delay, &mut shutdown).await {
                    return;
                }
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        state.install_game_store(store.clone()).await;
        info!("game store connected; leaving degraded mode");
        delay = INITIAL_DELAY;

        loop {
            if let Err(err) = state.mirror().health_check().await {
                if !state.is_degraded() {
                    warn!(error = %err, "mirror health check failed; entering degraded mode");
                }
                state.update_degraded(true);
                if !pause(HEALTH_POLL_INTERVAL, &mut shutdown).await {
                    return;
                }
                continue;
            }

            match store.health_check().await {
                Ok(()) => {
                    if state.is_degraded() {
                        info!("stores healthy again; leaving degraded mode");
                        state.update_degraded(false);
                    }
                    if !pause(HEALTH_POLL_INTERVAL, &mut shutdown).await {
                        return;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "game store health check failed; entering degraded mode");
                    state.update_degraded(true);

                    if reconnect(&store, &mut shutdown).await {
                        info!("game store reconnection succeeded after health check failure");
                        continue;
                    }
                    if *shutdown.borrow() {
                        return;
                    }

                    warn!("exhausted game store reconnect attempts; dropping the connection");
                    state.clear_game_store().await;
                    break;
                }
            }
        }

        if !pause(delay, &mut shutdown).await {
            return;
        }
        delay = (delay * 2).min(MAX_DELAY);
    }
}

async fn reconnect(store: &Arc<dyn GameStore>, shutdown: &mut watch::Receiver<bool>) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "game store reconnect attempt failed");
                if !pause(reconnect_delay, shutdown).await {
                    return false;
                }
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        services::presence::InMemoryPresence,
        state::{AppState, Collaborators},
        testing::{FakeGameStore, FakeMirror, FixedPolicy, RecordingNotifier},
    };

    #[tokio::test]
    async fn installs_the_store_and_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let state = AppState::new(
            AppConfig::default(),
            Collaborators {
                mirror: Arc::new(FakeMirror::default()),
                policy: Arc::new(FixedPolicy::none()),
                presence: Arc::new(InMemoryPresence::new()),
                notifier: Arc::new(RecordingNotifier::default()),
            },
            rx,
        );

        let supervisor = tokio::spawn(run(state.clone(), || async {
            Ok(Arc::new(FakeGameStore::default()) as Arc<dyn GameStore>)
        }));

        let mut degraded = state.degraded_watcher();
        tokio::time::timeout(Duration::from_secs(2), degraded.wait_for(|value| !*value))
            .await
            .unwrap()
            .unwrap();
        assert!(state.game_store().await.is_some());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), supervisor)
            .await
            .unwrap()
            .unwrap();
    }
}
