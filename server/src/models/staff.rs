use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Supervisor,
    Operator,
}

super::text_enum!(StaffRole, "staff role", {
    Supervisor => "supervisor",
    Operator => "operator",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: StaffRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl StaffMember {
    pub fn may_check_in_for(&self, event_id: Uuid) -> bool {
        self.is_active && self.event_id == event_id
    }
}

/// Argon2 password digest (PHC string). Never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StaffCredential {
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaffMember {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: StaffRole,
}

impl NewStaffMember {
    pub fn problem(&self) -> Option<String> {
        if self.name.trim().chars().count() < 2 {
            return Some("name must have at least 2 characters".to_string());
        }
        if !looks_like_email(&self.email) {
            return Some(format!("'{}' is not a valid email address", self.email));
        }
        None
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<StaffRole>,
    pub is_active: Option<bool>,
}

impl StaffPatch {
    pub fn problem(&self) -> Option<String> {
        if matches!(&self.name, Some(name) if name.trim().chars().count() < 2) {
            return Some("name must have at least 2 characters".to_string());
        }
        match &self.email {
            Some(email) if !looks_like_email(email) => {
                Some(format!("'{}' is not a valid email address", email))
            }
            _ => None,
        }
    }

    pub fn apply(self, staff: &mut StaffMember) {
        if let Some(name) = self.name {
            staff.name = name.trim().to_string();
        }
        if let Some(email) = self.email {
            staff.email = normalize_email(&email);
        }
        if let Some(phone) = self.phone {
            staff.phone = Some(phone);
        }
        if let Some(role) = self.role {
            staff.role = role;
        }
        if let Some(is_active) = self.is_active {
            staff.is_active = is_active;
        }
    }
}

/// What a staff login hands back to the door app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSession {
    pub staff_id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub staff_name: String,
    pub role: StaffRole,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}
