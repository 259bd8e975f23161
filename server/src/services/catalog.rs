use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{Availability, Event, NewEvent, NewTicketType, TicketType};
use crate::store::{CatalogStore, InventoryStore, StoreError};
use crate::utils::error::AppError;

/// A ticket type together with the ledger's live count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypeView {
    #[serde(flatten)]
    pub ticket_type: TicketType,
    pub remaining: u32,
}

#[derive(Clone)]
pub struct TicketCatalog {
    store: Arc<dyn CatalogStore>,
    inventory: Arc<dyn InventoryStore>,
    clock: Arc<dyn Clock>,
}

impl TicketCatalog {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        inventory: Arc<dyn InventoryStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            inventory,
            clock,
        }
    }

    pub async fn create_event(&self, draft: NewEvent) -> Result<Event, AppError> {
        if let Some(problem) = draft.problem() {
            return Err(AppError::ValidationError(problem));
        }
        let event = draft.into_event(Uuid::new_v4(), self.clock.now());
        let event = self.store.create_event(event).await?;
        info!(event_id = %event.id, title = %event.title, "Event created");
        Ok(event)
    }

    pub async fn get_event(&self, id: Uuid) -> Result<Event, AppError> {
        self.store
            .get_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", id)))
    }

    pub async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        Ok(self.store.list_events().await?)
    }

    pub async fn create_ticket_type(
        &self,
        event_id: Uuid,
        draft: NewTicketType,
    ) -> Result<TicketTypeView, AppError> {
        if let Some(problem) = draft.problem() {
            return Err(AppError::ValidationError(problem));
        }
        self.get_event(event_id).await?;

        let ticket_type = draft.into_ticket_type(Uuid::new_v4(), event_id, self.clock.now());
        let ticket_type = match self.store.create_ticket_type(ticket_type).await {
            Ok(ticket_type) => ticket_type,
            Err(StoreError::NotFound(what)) => {
                return Err(AppError::NotFound(format!("{} was not found", what)))
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            event_id = %event_id,
            ticket_type_id = %ticket_type.id,
            quantity = ticket_type.quantity,
            category = %ticket_type.category,
            "Ticket type created"
        );
        Ok(TicketTypeView {
            remaining: ticket_type.quantity,
            ticket_type,
        })
    }

    pub async fn get_ticket_type(&self, id: Uuid) -> Result<TicketTypeView, AppError> {
        let ticket_type = self
            .store
            .get_ticket_type(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket type '{}' was not found", id)))?;
        self.with_availability(ticket_type).await
    }

    pub async fn list_ticket_types(&self, event_id: Uuid) -> Result<Vec<TicketTypeView>, AppError> {
        self.get_event(event_id).await?;
        let mut views = Vec::new();
        for ticket_type in self.store.list_ticket_types(event_id).await? {
            views.push(self.with_availability(ticket_type).await?);
        }
        Ok(views)
    }

    async fn with_availability(&self, ticket_type: TicketType) -> Result<TicketTypeView, AppError> {
        let Availability {
            quantity,
            remaining,
            ..
        } = self
            .inventory
            .availability(ticket_type.id)
            .await?
            .ok_or_else(|| {
                AppError::InternalServerError(format!(
                    "ticket type {} has no inventory row",
                    ticket_type.id
                ))
            })?;
        Ok(TicketTypeView {
            ticket_type: TicketType {
                quantity,
                ..ticket_type
            },
            remaining,
        })
    }
}
