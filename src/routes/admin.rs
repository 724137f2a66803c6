use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::post,
};

use crate::{
    dto::admin::ReconcileResponse,
    error::AppError,
    services::{scheduler::SweepReport, sweep_service},
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Operator endpoints for triggering reconciliation outside the timer.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/sweep", post(trigger_sweep))
        .route("/admin/matches/{id}/reconcile", post(reconcile_match))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Run a full sweep now and return its tally.
pub async fn trigger_sweep(State(state): State<SharedState>) -> Result<Json<SweepReport>, AppError> {
    Ok(Json(sweep_service::run_sweep(&state).await?))
}

/// Reconcile one match now and return what changed.
pub async fn reconcile_match(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ReconcileResponse>, AppError> {
    Ok(Json(sweep_service::reconcile_match(&state, &id).await?))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    match state.config().admin_token.as_deref() {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized("admin token not configured".into())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::to_bytes, http::StatusCode};
    use serde_json::{Value, json};
    use tokio::sync::watch;
    use tower::ServiceExt;

    use crate::{
        config::AppConfig,
        dao::models::{MatchStatus, PlayerSlot},
        routes,
        services::presence::InMemoryPresence,
        state::{AppState, Collaborators},
        testing::{FakeGameStore, FakeMirror, FixedPolicy, RecordingNotifier, summary},
    };

    use super::*;

    fn app(admin_token: Option<&str>) -> (Router<()>, SharedState, Arc<FakeMirror>) {
        let (_tx, rx) = watch::channel(false);
        let mirror = Arc::new(FakeMirror::default());
        let config = AppConfig {
            admin_token: admin_token.map(str::to_owned),
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
        (routes::router(state.clone()), state, mirror)
    }

    fn post(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri);
        if let Some(token) = token {
            builder = builder.header("X-Admin-Token", token);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rejects_missing_wrong_and_unconfigured_tokens() {
        let (router, _, _) = app(Some("secret"));
        let missing = router.clone().oneshot(post("/admin/sweep", None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        let wrong = router
            .oneshot(post("/admin/sweep", Some("nope")))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let (closed, _, _) = app(None);
        let response = closed
            .oneshot(post("/admin/sweep", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sweep_is_unavailable_while_degraded() {
        let (router, _, _) = app(Some("secret"));
        let response = router
            .oneshot(post("/admin/sweep", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn reconcile_route_returns_outcome_or_not_found() {
        let (router, state, mirror) = app(Some("secret"));
        state
            .install_game_store(Arc::new(FakeGameStore::default()))
            .await;
        mirror.insert(summary("c1", MatchStatus::Active, true));
        mirror.set_slot("c1", Some(PlayerSlot::Zero));

        let response = router
            .clone()
            .oneshot(post("/admin/matches/c1/reconcile", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"match_id": "c1", "outcome": "turn_player_updated"})
        );

        let missing = router
            .oneshot(post("/admin/matches/ghost/reconcile", Some("secret")))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
