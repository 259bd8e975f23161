use axum::{extract::State, response::Response};
use serde::Serialize;

use crate::state::AppState;
use crate::utils::response::success;

pub mod checkins;
pub mod events;
pub mod extract;
pub mod reservations;
pub mod staff;
pub mod tickets;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    store: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "sanjapass-api",
        store: state.backend,
    };

    success(payload, "Health check successful")
}
