use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{CheckInRecord, CheckInSummary, IssuedTicket, StaffMember, TicketStatus};
use crate::services::staff::StaffDirectory;
use crate::store::{TicketStore, Transition};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Used,
    Invalid,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketValidation {
    pub status: ValidationStatus,
    pub ticket: Option<IssuedTicket>,
    pub check_in: Option<CheckInRecord>,
}

#[derive(Clone)]
pub struct CheckInValidator {
    tickets: Arc<dyn TicketStore>,
    staff: StaffDirectory,
    clock: Arc<dyn Clock>,
}

impl CheckInValidator {
    pub fn new(tickets: Arc<dyn TicketStore>, staff: StaffDirectory, clock: Arc<dyn Clock>) -> Self {
        Self {
            tickets,
            staff,
            clock,
        }
    }

    /// Read-only lookup for the door scanner's preview. Surrounding whitespace
    /// in `code` is ignored here and in `check_in`.
    pub async fn validate(&self, code: &str) -> Result<TicketValidation, AppError> {
        let Some(ticket) = self.tickets.find_by_code(code.trim()).await? else {
            return Ok(TicketValidation {
                status: ValidationStatus::Invalid,
                ticket: None,
                check_in: None,
            });
        };

        let (status, check_in) = match ticket.status {
            TicketStatus::Active => (ValidationStatus::Valid, None),
            TicketStatus::Cancelled => (ValidationStatus::Cancelled, None),
            TicketStatus::Used => (
                ValidationStatus::Used,
                self.tickets.check_in_for_ticket(ticket.id).await?,
            ),
        };
        Ok(TicketValidation {
            status,
            ticket: Some(ticket),
            check_in,
        })
    }

    pub async fn check_in(&self, code: &str, staff_id: Uuid) -> Result<CheckInRecord, AppError> {
        let staff = self.staff.active_member(staff_id).await?;
        self.admit(&staff, code).await
    }

    pub async fn check_in_at_event(
        &self,
        event_id: Uuid,
        code: &str,
        staff_id: Uuid,
    ) -> Result<CheckInRecord, AppError> {
        if !self.staff.authorize(staff_id, event_id).await? {
            warn!(staff_id = %staff_id, event_id = %event_id, "Check-in by unauthorized staff");
            return Err(AppError::NotAuthorized(staff_id));
        }
        self.check_in(code, staff_id).await
    }

    async fn admit(&self, staff: &StaffMember, code: &str) -> Result<CheckInRecord, AppError> {
        let ticket = self
            .tickets
            .find_by_code(code.trim())
            .await?
            .ok_or(AppError::InvalidCode)?;

        if ticket.event_id != staff.event_id {
            return Err(AppError::EventMismatch {
                ticket_event: ticket.event_id,
                staff_event: staff.event_id,
            });
        }

        let record = CheckInRecord {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            staff_id: staff.id,
            event_id: ticket.event_id,
            checked_in_at: self.clock.now(),
        };
        match self.tickets.check_in(record).await? {
            Transition::Applied(record) => {
                info!(
                    ticket_id = %record.ticket_id,
                    staff_id = %record.staff_id,
                    event_id = %record.event_id,
                    "Ticket checked in"
                );
                Ok(record)
            }
            Transition::Rejected(TicketStatus::Used) => Err(AppError::AlreadyUsed(ticket.id)),
            Transition::Rejected(TicketStatus::Cancelled) => Err(AppError::Cancelled(ticket.id)),
            Transition::Rejected(TicketStatus::Active) => Err(AppError::InternalServerError(
                format!("active ticket {} refused check-in", ticket.id),
            )),
            Transition::Missing => Err(AppError::InvalidCode),
        }
    }

    /// Invalidates an unused ticket. The units are not returned to stock.
    pub async fn cancel(&self, ticket_id: Uuid) -> Result<IssuedTicket, AppError> {
        match self.tickets.cancel(ticket_id, self.clock.now()).await? {
            Transition::Applied(ticket) => {
                info!(ticket_id = %ticket_id, "Ticket cancelled");
                Ok(ticket)
            }
            Transition::Rejected(TicketStatus::Used) => Err(AppError::AlreadyUsed(ticket_id)),
            Transition::Rejected(TicketStatus::Cancelled) => Err(AppError::Cancelled(ticket_id)),
            Transition::Rejected(TicketStatus::Active) => Err(AppError::InternalServerError(
                format!("active ticket {} refused cancellation", ticket_id),
            )),
            Transition::Missing => Err(AppError::NotFound(format!(
                "Ticket '{}' was not found",
                ticket_id
            ))),
        }
    }

    pub async fn history(&self, event_id: Uuid) -> Result<Vec<CheckInRecord>, AppError> {
        Ok(self.tickets.check_ins_for_event(event_id).await?)
    }

    pub async fn summary(&self, event_id: Uuid) -> Result<CheckInSummary, AppError> {
        Ok(self.tickets.summary_for_event(event_id).await?)
    }

    pub async fn tickets_for_owner(&self, owner_id: Uuid) -> Result<Vec<IssuedTicket>, AppError> {
        Ok(self.tickets.tickets_for_owner(owner_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_status_serializes_lowercase() {
        let body = serde_json::to_value(TicketValidation {
            status: ValidationStatus::Invalid,
            ticket: None,
            check_in: None,
        })
        .unwrap();
        assert_eq!(body["status"], "invalid");
        assert!(body["checkIn"].is_null());
    }
}
