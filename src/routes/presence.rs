use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::presence::PresenceEntry, services::sweep_service, state::SharedState};

/// List every player identity seen connected to a live match.
pub async fn list_presence(State(state): State<SharedState>) -> Json<Vec<PresenceEntry>> {
    Json(sweep_service::presence_entries(&state))
}

/// Configure the presence routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/presence", get(list_presence))
}
