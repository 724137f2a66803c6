//! Timer loop that runs a sweep on every tick until shutdown.

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::{error::SweepError, state::SharedState};

/// Run scheduled sweeps every configured interval.
///
/// Ticks that fire while a sweep is still running are dropped rather than
/// queued. Sweeps are skipped while the service is degraded.
pub async fn run(state: SharedState) {
    let mut shutdown = state.shutdown_watcher();
    let mut ticker = interval(state.config().sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        interval_secs = state.config().sweep_interval.as_secs(),
        concurrency = state.config().sweep_concurrency,
        "sweep driver started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        if state.is_degraded() {
            debug!("skipping sweep while degraded");
            continue;
        }

        let scheduler = match state.scheduler().await {
            Ok(scheduler) => scheduler,
            Err(SweepError::Degraded) => {
                debug!("skipping sweep; game store not installed");
                continue;
            }
            Err(err) => {
                error!(error = %err, "failed to prepare sweep");
                continue;
            }
        };

        if let Err(err) = scheduler.run().await {
            error!(error = %err, details = ?err, "sweep aborted");
        }
    }

    info!("sweep driver stopped");
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::sync::watch;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::models::{MatchStatus, TerminationDescriptor},
        services::presence::InMemoryPresence,
        state::{AppState, Collaborators},
        testing::{FakeGameStore, FakeMirror, FixedPolicy, RecordingNotifier, live_match, summary},
    };

    #[tokio::test]
    async fn ticks_sweep_installed_store_until_shutdown() {
        let (tx, rx) = watch::channel(false);
        let mirror = Arc::new(FakeMirror::default());
        let store = Arc::new(FakeGameStore::default());
        mirror.insert(summary("m1", MatchStatus::Aborted, false));
        store.insert("m1", live_match(1));

        let config = AppConfig {
            sweep_interval: Duration::from_millis(10),
            ..AppConfig::default()
        };
        let state = AppState::new(
            config,
            Collaborators {
                mirror: mirror.clone(),
                policy: Arc::new(FixedPolicy::none()),
                presence: Arc::new(InMemoryPresence::new()),
                notifier: Arc::new(RecordingNotifier::default()),
            },
            rx,
        );
        state.install_game_store(store.clone()).await;

        let driver = tokio::spawn(run(state.clone()));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while store.get("m1").unwrap().metadata.gameover.is_none() {
            assert!(tokio::time::Instant::now() < deadline, "sweep never ran");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            store.get("m1").unwrap().state.ctx.gameover,
            Some(TerminationDescriptor::aborted())
        );

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), driver)
            .await
            .unwrap()
            .unwrap();
    }
}
