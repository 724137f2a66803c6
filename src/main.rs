//! Match lifecycle binary entrypoint wiring the REST mirror, MongoDB game store, sweeps, and HTTP surface.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::{net::TcpListener, sync::watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use match_lifecycle::{
    config::AppConfig,
    dao::{
        game_store::{
            GameStore,
            mongodb::{MongoConfig, MongoGameStore},
        },
        mirror::rest::{RestMirror, RestMirrorConfig},
        storage::StorageError,
    },
    routes,
    services::{
        notifier::BroadcastNotifier, presence::InMemoryPresence, storage_supervisor,
        sweep_driver, termination::ClockPolicy,
    },
    state::{AppState, Collaborators, SharedState},
};

const GAME_END_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mirror = RestMirror::new(RestMirrorConfig::from_env().context("configuring mirror")?)
        .context("building mirror client")?;

    let notifier = BroadcastNotifier::new(GAME_END_CHANNEL_CAPACITY);
    tokio::spawn(log_game_ends(notifier.subscribe()));

    let app_state = AppState::new(
        config,
        Collaborators {
            mirror: Arc::new(mirror),
            policy: Arc::new(ClockPolicy),
            presence: Arc::new(InMemoryPresence::new()),
            notifier: Arc::new(notifier),
        },
        shutdown_rx,
    );

    let supervisor = tokio::spawn(storage_supervisor::run(app_state.clone(), || async {
        let config = MongoConfig::from_env().await.map_err(StorageError::from)?;
        let store = MongoGameStore::connect(config)
            .await
            .map_err(StorageError::from)?;
        Ok(Arc::new(store) as Arc<dyn GameStore>)
    }));
    let driver = tokio::spawn(sweep_driver::run(app_state.clone()));

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("serving axum")?;

    // Let an in-flight sweep finish its started matches before exiting.
    if let Err(err) = driver.await {
        warn!(error = %err, "sweep driver task failed");
    }
    if let Err(err) = supervisor.await {
        warn!(error = %err, "storage supervisor task failed");
    }

    info!("shutdown complete");
    Ok(())
}

/// Log every game end published by the reconciler.
async fn log_game_ends(
    mut events: tokio::sync::broadcast::Receiver<match_lifecycle::services::notifier::GameEnd>,
) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(event) => info!(
                match_id = %event.match_id,
                gameover = ?event.ctx.gameover,
                "game ended"
            ),
            Err(RecvError::Lagged(missed)) => warn!(missed, "game end log fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM, then tell background tasks to stop.
async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown requested");
    let _ = shutdown.send(true);
}
