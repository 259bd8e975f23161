use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Upper bound on the quota of a single ticket type.
pub const MAX_TICKET_QUANTITY: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketCategory {
    #[default]
    Standard,
    Vip,
    EarlyBird,
    Student,
    Group,
}

super::text_enum!(TicketCategory, "ticket category", {
    Standard => "standard",
    Vip => "vip",
    EarlyBird => "early-bird",
    Student => "student",
    Group => "group",
});

/// A purchasable tier of an event. The live `remaining` count is owned by the
/// inventory ledger and reported separately as [`Availability`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[sqlx(try_from = "i32")]
    pub quantity: u32,
    pub batch: String,
    #[sqlx(try_from = "String")]
    pub category: TicketCategory,
    pub sales_start: DateTime<Utc>,
    pub sales_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TicketType {
    pub fn on_sale_at(&self, at: DateTime<Utc>) -> bool {
        self.sales_start <= at && at < self.sales_end
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicketType {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: u32,
    pub batch: Option<String>,
    #[serde(default)]
    pub category: TicketCategory,
    pub sales_start: DateTime<Utc>,
    pub sales_end: DateTime<Utc>,
}

impl NewTicketType {
    pub fn problem(&self) -> Option<String> {
        if self.name.trim().chars().count() < 2 {
            return Some("name must have at least 2 characters".to_string());
        }
        if self.price.is_sign_negative() {
            return Some("price must not be negative".to_string());
        }
        if self.quantity == 0 || self.quantity > MAX_TICKET_QUANTITY {
            return Some(format!(
                "quantity must be between 1 and {}",
                MAX_TICKET_QUANTITY
            ));
        }
        if matches!(&self.batch, Some(batch) if batch.trim().is_empty()) {
            return Some("batch must not be blank".to_string());
        }
        if self.sales_start >= self.sales_end {
            return Some("salesStart must be before salesEnd".to_string());
        }
        None
    }

    pub fn into_ticket_type(self, id: Uuid, event_id: Uuid, now: DateTime<Utc>) -> TicketType {
        TicketType {
            id,
            event_id,
            name: self.name.trim().to_string(),
            description: self.description,
            price: self.price,
            quantity: self.quantity,
            batch: self
                .batch
                .map(|batch| batch.trim().to_string())
                .unwrap_or_else(|| "1º Lote".to_string()),
            category: self.category,
            sales_start: self.sales_start,
            sales_end: self.sales_end,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub ticket_type_id: Uuid,
    pub quantity: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Used,
    Cancelled,
}

super::text_enum!(TicketStatus, "ticket status", {
    Active => "active",
    Used => "used",
    Cancelled => "cancelled",
});

impl TicketStatus {
    /// Only `active` tickets move, and only forward.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Active, TicketStatus::Used)
                | (TicketStatus::Active, TicketStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IssuedTicket {
    pub id: Uuid,
    pub ticket_type_id: Uuid,
    pub event_id: Uuid,
    pub reservation_id: Uuid,
    pub owner_id: Uuid,
    pub code: String,
    #[sqlx(try_from = "String")]
    pub status: TicketStatus,
    pub issued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
