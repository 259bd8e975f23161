use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRecord {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub staff_id: Uuid,
    pub event_id: Uuid,
    pub checked_in_at: DateTime<Utc>,
}

/// Door counts for an event's dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInSummary {
    pub issued: u64,
    pub active: u64,
    pub checked_in: u64,
    pub cancelled: u64,
}
