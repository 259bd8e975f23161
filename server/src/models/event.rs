use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub category: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    #[serde(default)]
    pub category: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl NewEvent {
    /// Returns a human readable reason when the payload cannot become an event.
    pub fn problem(&self) -> Option<String> {
        if self.title.trim().chars().count() < 2 {
            return Some("title must have at least 2 characters".to_string());
        }
        if self.location.trim().is_empty() {
            return Some("location is required".to_string());
        }
        match self.end_time {
            Some(end) if end <= self.start_time => {
                Some("endTime must be after startTime".to_string())
            }
            _ => None,
        }
    }

    pub fn into_event(self, id: Uuid, now: DateTime<Utc>) -> Event {
        Event {
            id,
            organizer_id: self.organizer_id,
            title: self.title.trim().to_string(),
            description: self.description,
            location: self.location.trim().to_string(),
            category: self.category,
            start_time: self.start_time,
            end_time: self.end_time,
            created_at: now,
            updated_at: now,
        }
    }
}
