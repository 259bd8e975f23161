use axum::{extract::State, response::Response};
use uuid::Uuid;

use super::extract::{JsonBody, PathParam};
use crate::models::{NewEvent, NewTicketType};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn create_event(
    State(state): State<AppState>,
    JsonBody(draft): JsonBody<NewEvent>,
) -> Result<Response, AppError> {
    let event = state.catalog.create_event(draft).await?;
    Ok(created(event, "Event created"))
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.catalog.list_events().await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(
    State(state): State<AppState>,
    PathParam(event_id): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let event = state.catalog.get_event(event_id).await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn create_ticket_type(
    State(state): State<AppState>,
    PathParam(event_id): PathParam<Uuid>,
    JsonBody(draft): JsonBody<NewTicketType>,
) -> Result<Response, AppError> {
    let view = state.catalog.create_ticket_type(event_id, draft).await?;
    Ok(created(view, "Ticket type created"))
}

pub async fn list_ticket_types(
    State(state): State<AppState>,
    PathParam(event_id): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let views = state.catalog.list_ticket_types(event_id).await?;
    Ok(success(views, "Ticket types retrieved"))
}

pub async fn get_ticket_type(
    State(state): State<AppState>,
    PathParam(ticket_type_id): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let view = state.catalog.get_ticket_type(ticket_type_id).await?;
    Ok(success(view, "Ticket type retrieved"))
}
