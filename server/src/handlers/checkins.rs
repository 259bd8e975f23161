use axum::{extract::State, response::Response};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{JsonBody, PathParam};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub code: String,
    pub staff_id: Uuid,
}

pub async fn check_in(
    State(state): State<AppState>,
    PathParam(event_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<CheckInRequest>,
) -> Result<Response, AppError> {
    let record = state
        .checkins
        .check_in_at_event(event_id, &body.code, body.staff_id)
        .await?;
    Ok(created(record, "Check-in completed"))
}

pub async fn history(
    State(state): State<AppState>,
    PathParam(event_id): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let records = state.checkins.history(event_id).await?;
    Ok(success(records, "Check-in history retrieved"))
}

pub async fn summary(
    State(state): State<AppState>,
    PathParam(event_id): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let summary = state.checkins.summary(event_id).await?;
    Ok(success(summary, "Check-in summary retrieved"))
}
