//! Repository interfaces for the ticketing core.
//!
//! Every method that mutates contended state is a single atomic step at this
//! layer: the services never read-then-write through two calls. Two backends
//! implement the traits, [`memory::MemoryStore`] and [`postgres::PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Availability, CheckInRecord, CheckInSummary, Event, IssuedTicket, Reservation,
    ReservationStatus, StaffCredential, StaffMember, StaffPatch, TicketStatus, TicketType,
};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of finalising a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The reservation moved to `confirmed` and these tickets were stored.
    Committed(Reservation, Vec<IssuedTicket>),
    /// An earlier call already confirmed it; these are the tickets it issued.
    AlreadyConfirmed(Reservation, Vec<IssuedTicket>),
    /// Released or expired. A pending reservation found past its deadline is
    /// expired by the same call and reported here.
    NotPending(ReservationStatus),
    /// One of the offered codes already exists; nothing was written.
    DuplicateCode,
    NotFound,
}

/// Result of a compare-and-swap on a ticket's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<T> {
    Applied(T),
    Rejected(TicketStatus),
    Missing,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_event(&self, event: Event) -> StoreResult<Event>;
    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>>;
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    /// Stores the definition and opens its inventory with `remaining = quantity`.
    async fn create_ticket_type(&self, ticket_type: TicketType) -> StoreResult<TicketType>;
    async fn get_ticket_type(&self, id: Uuid) -> StoreResult<Option<TicketType>>;
    async fn list_ticket_types(&self, event_id: Uuid) -> StoreResult<Vec<TicketType>>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn availability(&self, ticket_type_id: Uuid) -> StoreResult<Option<Availability>>;

    /// Raises quantity and remaining by the same amount. Fails with `Conflict`
    /// and changes nothing when the new quantity would exceed `cap`.
    async fn add_quantity(
        &self,
        ticket_type_id: Uuid,
        additional: u32,
        cap: u32,
    ) -> StoreResult<Option<Availability>>;

    /// Compare-and-decrement `remaining` by `reservation.quantity` and record the
    /// pending reservation. `Ok(false)` means there was not enough stock and
    /// nothing changed.
    async fn reserve(&self, reservation: &Reservation) -> StoreResult<bool>;

    async fn get_reservation(&self, id: Uuid) -> StoreResult<Option<Reservation>>;

    /// Moves a pending reservation to `to` (released or expired) and returns its
    /// quantity to stock. `Ok(None)` when it is unknown or no longer pending.
    async fn release(
        &self,
        id: Uuid,
        to: ReservationStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Reservation>>;

    /// Confirms a pending reservation and stores `tickets` in one step.
    async fn confirm(
        &self,
        id: Uuid,
        purchaser_id: Uuid,
        tickets: Vec<IssuedTicket>,
        at: DateTime<Utc>,
    ) -> StoreResult<ConfirmOutcome>;

    /// Pending reservations whose deadline is at or before `now`.
    async fn expired_reservations(&self, now: DateTime<Utc>) -> StoreResult<Vec<Uuid>>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn code_exists(&self, code: &str) -> StoreResult<bool>;
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<IssuedTicket>>;
    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<IssuedTicket>>;
    async fn tickets_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<IssuedTicket>>;

    /// CAS `active -> used` and append `record` as one step.
    async fn check_in(&self, record: CheckInRecord) -> StoreResult<Transition<CheckInRecord>>;

    /// CAS `active -> cancelled`.
    async fn cancel(&self, ticket_id: Uuid, at: DateTime<Utc>)
        -> StoreResult<Transition<IssuedTicket>>;

    async fn check_in_for_ticket(&self, ticket_id: Uuid) -> StoreResult<Option<CheckInRecord>>;
    async fn check_ins_for_event(&self, event_id: Uuid) -> StoreResult<Vec<CheckInRecord>>;
    async fn summary_for_event(&self, event_id: Uuid) -> StoreResult<CheckInSummary>;
}

#[async_trait]
pub trait StaffStore: Send + Sync {
    /// Fails with `Conflict` when the email is already registered for the event.
    async fn create_staff(
        &self,
        staff: StaffMember,
        credential: StaffCredential,
    ) -> StoreResult<StaffMember>;
    async fn get_staff(&self, id: Uuid) -> StoreResult<Option<StaffMember>>;
    async fn find_staff_login(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<(StaffMember, StaffCredential)>>;
    async fn list_staff(&self, event_id: Uuid) -> StoreResult<Vec<StaffMember>>;
    async fn update_staff(&self, id: Uuid, patch: StaffPatch) -> StoreResult<Option<StaffMember>>;
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
}

/// Everything the service layer needs from a backend.
pub trait Store: CatalogStore + InventoryStore + TicketStore + StaffStore + 'static {
    fn backend_name(&self) -> &'static str;
}
