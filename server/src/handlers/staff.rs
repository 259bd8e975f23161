use axum::{extract::State, response::Response};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{JsonBody, PathParam};
use crate::models::{NewStaffMember, StaffPatch};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub event_id: Uuid,
    pub email: String,
    pub password: String,
}

pub async fn create_staff(
    State(state): State<AppState>,
    PathParam(event_id): PathParam<Uuid>,
    JsonBody(draft): JsonBody<NewStaffMember>,
) -> Result<Response, AppError> {
    let staff = state.staff.create_staff(event_id, draft).await?;
    Ok(created(
        staff,
        "Staff member created; credentials are being sent by email",
    ))
}

pub async fn list_staff(
    State(state): State<AppState>,
    PathParam(event_id): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let members = state.staff.list_staff(event_id).await?;
    Ok(success(members, "Staff retrieved"))
}

pub async fn get_staff(
    State(state): State<AppState>,
    PathParam(staff_id): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let staff = state.staff.get_staff(staff_id).await?;
    Ok(success(staff, "Staff member retrieved"))
}

pub async fn update_staff(
    State(state): State<AppState>,
    PathParam(staff_id): PathParam<Uuid>,
    JsonBody(patch): JsonBody<StaffPatch>,
) -> Result<Response, AppError> {
    let staff = state.staff.update_staff(staff_id, patch).await?;
    Ok(success(staff, "Staff member updated"))
}

pub async fn deactivate(
    State(state): State<AppState>,
    PathParam(staff_id): PathParam<Uuid>,
) -> Result<Response, AppError> {
    let staff = state.staff.deactivate(staff_id).await?;
    Ok(success(staff, "Staff member deactivated"))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, AppError> {
    let session = state
        .staff
        .login(body.event_id, &body.email, &body.password)
        .await?;
    Ok(success(session, "Login successful"))
}
