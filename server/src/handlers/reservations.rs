use axum::{extract::State, response::Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::{JsonBody, PathParam};
use crate::models::Reservation;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub purchaser_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityRequest {
    pub additional: u32,
}

/// What the buyer needs to come back and confirm.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationReceipt {
    pub reservation_token: Uuid,
    pub ticket_type_id: Uuid,
    pub event_id: Uuid,
    pub quantity: u32,
    pub expires_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationReceipt {
    fn from(reservation: Reservation) -> Self {
        Self {
            reservation_token: reservation.id,
            ticket_type_id: reservation.ticket_type_id,
            event_id: reservation.event_id,
            quantity: reservation.quantity,
            expires_at: reservation.expires_at,
        }
    }
}

pub async fn reserve(
    State(state): State<AppState>,
    PathParam(ticket_type_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<ReserveRequest>,
) -> Result<Response, AppError> {
    let reservation = state.ledger.reserve(ticket_type_id, body.quantity).await?;
    Ok(created(
        ReservationReceipt::from(reservation),
        "Tickets reserved",
    ))
}

pub async fn increase_quantity(
    State(state): State<AppState>,
    PathParam(ticket_type_id): PathParam<Uuid>,
    JsonBody(body): JsonBody<QuantityRequest>,
) -> Result<Response, AppError> {
    let availability = state
        .ledger
        .increase_quantity(ticket_type_id, body.additional)
        .await?;
    Ok(success(availability, "Ticket quantity increased"))
}

pub async fn get_reservation(
    State(state): State<AppState>,
    PathParam(token): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let reservation = state.ledger.get_reservation(token).await?;
    Ok(success(reservation, "Reservation retrieved"))
}

pub async fn confirm(
    State(state): State<AppState>,
    PathParam(token): PathParam<Uuid>,
    JsonBody(body): JsonBody<ConfirmRequest>,
) -> Result<Response, AppError> {
    let confirmation = state.ledger.confirm(token, body.purchaser_id).await?;
    Ok(success(confirmation, "Reservation confirmed"))
}

pub async fn release(
    State(state): State<AppState>,
    PathParam(token): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let reservation = state.ledger.release(token).await?;
    Ok(success(reservation, "Reservation released"))
}
