#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use sanjapass_server::clock::{Clock, ManualClock};
use sanjapass_server::config::Config;
use sanjapass_server::crypto::OsSecureRandom;
use sanjapass_server::models::{
    Event, IssuedTicket, NewEvent, NewStaffMember, NewTicketType, StaffMember, StaffRole,
    TicketCategory, TicketStatus,
};
use sanjapass_server::services::{CredentialNotifier, TicketTypeView};
use sanjapass_server::state::AppState;
use sanjapass_server::store::memory::MemoryStore;
use sanjapass_server::store::InventoryStore;

/// Captures delivered staff credentials so tests can log in with them.
pub struct CapturingNotifier {
    sender: mpsc::UnboundedSender<(String, String)>,
}

#[async_trait]
impl CredentialNotifier for CapturingNotifier {
    async fn send_staff_credentials(
        &self,
        staff: &StaffMember,
        _event_title: &str,
        temporary_password: &str,
    ) -> anyhow::Result<()> {
        self.sender
            .send((staff.email.clone(), temporary_password.to_string()))?;
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub config: Config,
    pub state: AppState,
    credentials: Mutex<mpsc::UnboundedReceiver<(String, String)>>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn harness() -> Harness {
    let config = Config::from_lookup(|_| None).unwrap();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let (sender, receiver) = mpsc::unbounded_channel();
    let state = AppState::new(
        store.clone(),
        &config,
        clock.clone(),
        Arc::new(OsSecureRandom),
        Arc::new(CapturingNotifier { sender }),
    );
    Harness {
        store,
        clock,
        config,
        state,
        credentials: Mutex::new(receiver),
    }
}

impl Harness {
    pub async fn event(&self) -> Event {
        self.state
            .catalog
            .create_event(NewEvent {
                organizer_id: Uuid::new_v4(),
                title: "Rock in Rio".to_string(),
                description: Some("Main stage".to_string()),
                location: "Parque Olímpico, Rio de Janeiro".to_string(),
                category: "music".to_string(),
                start_time: self.clock.now() + Duration::days(60),
                end_time: None,
            })
            .await
            .unwrap()
    }

    pub async fn ticket_type(&self, event_id: Uuid, quantity: u32) -> TicketTypeView {
        self.state
            .catalog
            .create_ticket_type(
                event_id,
                NewTicketType {
                    name: "Pista".to_string(),
                    description: None,
                    price: Decimal::new(45000, 2),
                    quantity,
                    batch: None,
                    category: TicketCategory::Standard,
                    sales_start: self.clock.now() - Duration::days(1),
                    sales_end: self.clock.now() + Duration::days(30),
                },
            )
            .await
            .unwrap()
    }

    pub async fn remaining(&self, ticket_type_id: Uuid) -> u32 {
        self.state
            .ledger
            .availability(ticket_type_id)
            .await
            .unwrap()
            .remaining
    }

    /// Reserves and confirms `quantity` units for a fresh purchaser.
    pub async fn sold_tickets(&self, ticket_type_id: Uuid, quantity: u32) -> Vec<IssuedTicket> {
        let reservation = self
            .state
            .ledger
            .reserve(ticket_type_id, quantity)
            .await
            .unwrap();
        self.state
            .ledger
            .confirm(reservation.id, Uuid::new_v4())
            .await
            .unwrap()
            .tickets
    }

    /// Issues one ticket carrying a chosen code, bypassing the random source.
    pub async fn ticket_with_code(&self, ticket_type_id: Uuid, code: &str) -> IssuedTicket {
        let reservation = self.state.ledger.reserve(ticket_type_id, 1).await.unwrap();
        let now = self.clock.now();
        let ticket = IssuedTicket {
            id: Uuid::new_v4(),
            ticket_type_id,
            event_id: reservation.event_id,
            reservation_id: reservation.id,
            owner_id: Uuid::new_v4(),
            code: code.to_string(),
            status: TicketStatus::Active,
            issued_at: now,
            updated_at: now,
        };
        self.store
            .confirm(reservation.id, ticket.owner_id, vec![ticket.clone()], now)
            .await
            .unwrap();
        ticket
    }

    pub async fn staff(&self, event_id: Uuid, email: &str) -> StaffMember {
        self.state
            .staff
            .create_staff(
                event_id,
                NewStaffMember {
                    name: "Carla Mendes".to_string(),
                    email: email.to_string(),
                    phone: Some("+55 21 99999-0000".to_string()),
                    role: StaffRole::Operator,
                },
            )
            .await
            .unwrap()
    }

    /// Waits for the next credentials the directory hands to the notifier.
    pub async fn next_credentials(&self) -> (String, String) {
        let mut receiver = self.credentials.lock().await;
        tokio::time::timeout(std::time::Duration::from_secs(5), receiver.recv())
            .await
            .expect("credentials were not delivered in time")
            .expect("notifier channel closed")
    }
}
