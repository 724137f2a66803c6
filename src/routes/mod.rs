use axum::Router;

use crate::state::SharedState;

/// Operator endpoints guarded by the admin token.
pub mod admin;
/// Liveness and store health.
pub mod health;
/// Player last-seen listing.
pub mod presence;

/// Compose all route trees and attach shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(presence::router())
        .merge(admin::router(state.clone()))
        .with_state(state)
}
