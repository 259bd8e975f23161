use axum::{extract::State, response::Response};
use uuid::Uuid;

use super::extract::PathParam;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn validate(
    State(state): State<AppState>,
    PathParam(code): PathParam<String>,
) -> Result<Response, AppError> {
    let validation = state.checkins.validate(&code).await?;
    Ok(success(validation, "Ticket validated"))
}

pub async fn cancel(
    State(state): State<AppState>,
    PathParam(ticket_id): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let ticket = state.checkins.cancel(ticket_id).await?;
    Ok(success(ticket, "Ticket cancelled"))
}

pub async fn tickets_for_owner(
    State(state): State<AppState>,
    PathParam(owner_id): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let tickets = state.checkins.tickets_for_owner(owner_id).await?;
    Ok(success(tickets, "Tickets retrieved"))
}
