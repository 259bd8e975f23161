use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Released,
    Expired,
}

super::text_enum!(ReservationStatus, "reservation status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Released => "released",
    Expired => "expired",
});

/// A time-boxed hold on inventory. The `id` doubles as the reservation token
/// handed to the purchaser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub ticket_type_id: Uuid,
    pub event_id: Uuid,
    #[sqlx(try_from = "i32")]
    pub quantity: u32,
    #[sqlx(try_from = "String")]
    pub status: ReservationStatus,
    pub purchaser_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn pending(
        ticket_type_id: Uuid,
        event_id: Uuid,
        quantity: u32,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_type_id,
            event_id,
            quantity,
            status: ReservationStatus::Pending,
            purchaser_id: None,
            created_at: now,
            expires_at,
            resolved_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Pending && self.expires_at <= now
    }
}
