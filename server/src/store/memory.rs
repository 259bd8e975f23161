//! In-memory backend.
//!
//! Maps are guarded by `tokio::sync::RwLock` and held only long enough to look
//! up or insert an entry. Contended state lives behind per-entity primitives:
//! - a ticket type's `remaining` is an `AtomicU32` decremented with a CAS loop,
//! - each reservation and each issued ticket sits in its own `Mutex`, so
//!   confirm/release on one token and check-in on one ticket serialize without
//!   blocking unrelated entities.
//!
//! Not durable: all state is lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{
    CatalogStore, ConfirmOutcome, InventoryStore, StaffStore, Store, StoreError, StoreResult,
    TicketStore, Transition,
};
use crate::models::{
    Availability, CheckInRecord, CheckInSummary, Event, IssuedTicket, Reservation,
    ReservationStatus, StaffCredential, StaffMember, StaffPatch, TicketStatus, TicketType,
};

struct InventorySlot {
    ticket_type: TicketType,
    quantity: AtomicU32,
    remaining: AtomicU32,
}

impl InventorySlot {
    fn new(ticket_type: TicketType) -> Self {
        let quantity = ticket_type.quantity;
        Self {
            ticket_type,
            quantity: AtomicU32::new(quantity),
            remaining: AtomicU32::new(quantity),
        }
    }

    fn availability(&self) -> Availability {
        // remaining first: quantity never shrinks, so the pair stays ordered
        let remaining = self.remaining.load(Ordering::SeqCst);
        let quantity = self.quantity.load(Ordering::SeqCst);
        Availability {
            ticket_type_id: self.ticket_type.id,
            quantity,
            remaining,
        }
    }

    fn ticket_type(&self) -> TicketType {
        TicketType {
            quantity: self.quantity.load(Ordering::SeqCst),
            ..self.ticket_type.clone()
        }
    }

    fn take(&self, quantity: u32) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(quantity)
            })
            .is_ok()
    }

    fn give_back(&self, quantity: u32) {
        self.remaining.fetch_add(quantity, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    events: RwLock<HashMap<Uuid, Event>>,
    ticket_types: RwLock<HashMap<Uuid, Arc<InventorySlot>>>,
    reservations: RwLock<HashMap<Uuid, Arc<Mutex<Reservation>>>>,
    tickets: RwLock<HashMap<Uuid, Arc<Mutex<IssuedTicket>>>>,
    codes: RwLock<HashMap<String, Uuid>>,
    reservation_tickets: RwLock<HashMap<Uuid, Vec<Uuid>>>,
    check_ins: RwLock<HashMap<Uuid, CheckInRecord>>,
    staff: RwLock<HashMap<Uuid, (StaffMember, StaffCredential)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, ticket_type_id: Uuid) -> Option<Arc<InventorySlot>> {
        self.ticket_types.read().await.get(&ticket_type_id).cloned()
    }

    async fn reservation_cell(&self, id: Uuid) -> Option<Arc<Mutex<Reservation>>> {
        self.reservations.read().await.get(&id).cloned()
    }

    async fn ticket_cell(&self, id: Uuid) -> Option<Arc<Mutex<IssuedTicket>>> {
        self.tickets.read().await.get(&id).cloned()
    }

    async fn restock(&self, reservation: &Reservation) -> StoreResult<()> {
        let slot = self.slot(reservation.ticket_type_id).await.ok_or_else(|| {
            StoreError::NotFound(format!("ticket type {}", reservation.ticket_type_id))
        })?;
        slot.give_back(reservation.quantity);
        Ok(())
    }

    async fn issued_for(&self, reservation_id: Uuid) -> Vec<IssuedTicket> {
        let ids = self
            .reservation_tickets
            .read()
            .await
            .get(&reservation_id)
            .cloned()
            .unwrap_or_default();
        let mut issued = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(cell) = self.ticket_cell(id).await {
                issued.push(cell.lock().await.clone());
            }
        }
        issued
    }

    async fn all_tickets(&self) -> Vec<Arc<Mutex<IssuedTicket>>> {
        self.tickets.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        let mut events = self.events.write().await;
        if events.contains_key(&event.id) {
            return Err(StoreError::Conflict(format!("event {} exists", event.id)));
        }
        events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = self.events.read().await.values().cloned().collect();
        events.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn create_ticket_type(&self, ticket_type: TicketType) -> StoreResult<TicketType> {
        let mut ticket_types = self.ticket_types.write().await;
        if ticket_types.contains_key(&ticket_type.id) {
            return Err(StoreError::Conflict(format!(
                "ticket type {} exists",
                ticket_type.id
            )));
        }
        ticket_types.insert(
            ticket_type.id,
            Arc::new(InventorySlot::new(ticket_type.clone())),
        );
        Ok(ticket_type)
    }

    async fn get_ticket_type(&self, id: Uuid) -> StoreResult<Option<TicketType>> {
        Ok(self.slot(id).await.map(|slot| slot.ticket_type()))
    }

    async fn list_ticket_types(&self, event_id: Uuid) -> StoreResult<Vec<TicketType>> {
        let mut ticket_types: Vec<TicketType> = self
            .ticket_types
            .read()
            .await
            .values()
            .filter(|slot| slot.ticket_type.event_id == event_id)
            .map(|slot| slot.ticket_type())
            .collect();
        ticket_types.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(ticket_types)
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn availability(&self, ticket_type_id: Uuid) -> StoreResult<Option<Availability>> {
        Ok(self.slot(ticket_type_id).await.map(|slot| slot.availability()))
    }

    async fn add_quantity(
        &self,
        ticket_type_id: Uuid,
        additional: u32,
        cap: u32,
    ) -> StoreResult<Option<Availability>> {
        let Some(slot) = self.slot(ticket_type_id).await else {
            return Ok(None);
        };
        // quantity grows before remaining so `remaining <= quantity` holds throughout
        slot.quantity
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |q| {
                q.checked_add(additional).filter(|&next| next <= cap)
            })
            .map_err(|q| {
                StoreError::Conflict(format!(
                    "quantity {} plus {} would exceed {}",
                    q, additional, cap
                ))
            })?;
        slot.give_back(additional);
        Ok(Some(slot.availability()))
    }

    async fn reserve(&self, reservation: &Reservation) -> StoreResult<bool> {
        let slot = self.slot(reservation.ticket_type_id).await.ok_or_else(|| {
            StoreError::NotFound(format!("ticket type {}", reservation.ticket_type_id))
        })?;
        if !slot.take(reservation.quantity) {
            return Ok(false);
        }
        self.reservations
            .write()
            .await
            .insert(reservation.id, Arc::new(Mutex::new(reservation.clone())));
        Ok(true)
    }

    async fn get_reservation(&self, id: Uuid) -> StoreResult<Option<Reservation>> {
        match self.reservation_cell(id).await {
            Some(cell) => Ok(Some(cell.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn release(
        &self,
        id: Uuid,
        to: ReservationStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Reservation>> {
        let Some(cell) = self.reservation_cell(id).await else {
            return Ok(None);
        };
        let mut reservation = cell.lock().await;
        if reservation.status != ReservationStatus::Pending {
            return Ok(None);
        }
        self.restock(&reservation).await?;
        reservation.status = to;
        reservation.resolved_at = Some(at);
        Ok(Some(reservation.clone()))
    }

    async fn confirm(
        &self,
        id: Uuid,
        purchaser_id: Uuid,
        tickets: Vec<IssuedTicket>,
        at: DateTime<Utc>,
    ) -> StoreResult<ConfirmOutcome> {
        let Some(cell) = self.reservation_cell(id).await else {
            return Ok(ConfirmOutcome::NotFound);
        };
        let mut reservation = cell.lock().await;

        match reservation.status {
            ReservationStatus::Confirmed => {
                let issued = self.issued_for(id).await;
                return Ok(ConfirmOutcome::AlreadyConfirmed(reservation.clone(), issued));
            }
            ReservationStatus::Released | ReservationStatus::Expired => {
                return Ok(ConfirmOutcome::NotPending(reservation.status));
            }
            ReservationStatus::Pending if reservation.expires_at <= at => {
                self.restock(&reservation).await?;
                reservation.status = ReservationStatus::Expired;
                reservation.resolved_at = Some(at);
                return Ok(ConfirmOutcome::NotPending(ReservationStatus::Expired));
            }
            ReservationStatus::Pending => {}
        }

        if tickets.len() != reservation.quantity as usize {
            return Err(StoreError::Unexpected(anyhow::anyhow!(
                "reservation {} holds {} unit(s) but {} ticket(s) were offered",
                id,
                reservation.quantity,
                tickets.len()
            )));
        }

        {
            let mut codes = self.codes.write().await;
            let mut batch = HashSet::with_capacity(tickets.len());
            let clash = tickets
                .iter()
                .any(|t| codes.contains_key(&t.code) || !batch.insert(t.code.as_str()));
            if clash {
                return Ok(ConfirmOutcome::DuplicateCode);
            }
            for ticket in &tickets {
                codes.insert(ticket.code.clone(), ticket.id);
            }
        }
        {
            let mut stored = self.tickets.write().await;
            for ticket in &tickets {
                stored.insert(ticket.id, Arc::new(Mutex::new(ticket.clone())));
            }
        }
        self.reservation_tickets
            .write()
            .await
            .insert(id, tickets.iter().map(|t| t.id).collect());

        reservation.status = ReservationStatus::Confirmed;
        reservation.purchaser_id = Some(purchaser_id);
        reservation.resolved_at = Some(at);
        Ok(ConfirmOutcome::Committed(reservation.clone(), tickets))
    }

    async fn expired_reservations(&self, now: DateTime<Utc>) -> StoreResult<Vec<Uuid>> {
        let cells: Vec<Arc<Mutex<Reservation>>> =
            self.reservations.read().await.values().cloned().collect();
        let mut expired = Vec::new();
        for cell in cells {
            let reservation = cell.lock().await;
            if reservation.is_expired_at(now) {
                expired.push(reservation.id);
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn code_exists(&self, code: &str) -> StoreResult<bool> {
        Ok(self.codes.read().await.contains_key(code))
    }

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<IssuedTicket>> {
        let id = self.codes.read().await.get(code).copied();
        match id {
            Some(id) => self.get_ticket(id).await,
            None => Ok(None),
        }
    }

    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<IssuedTicket>> {
        match self.ticket_cell(id).await {
            Some(cell) => Ok(Some(cell.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn tickets_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<IssuedTicket>> {
        let mut owned = Vec::new();
        for cell in self.all_tickets().await {
            let ticket = cell.lock().await;
            if ticket.owner_id == owner_id {
                owned.push(ticket.clone());
            }
        }
        owned.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn check_in(&self, record: CheckInRecord) -> StoreResult<Transition<CheckInRecord>> {
        let Some(cell) = self.ticket_cell(record.ticket_id).await else {
            return Ok(Transition::Missing);
        };
        // The ticket lock is held until the record is visible, so no reader
        // can observe `used` without its check-in.
        let mut ticket = cell.lock().await;
        if !ticket.status.can_transition_to(TicketStatus::Used) {
            return Ok(Transition::Rejected(ticket.status));
        }
        let mut check_ins = self.check_ins.write().await;
        if check_ins.contains_key(&record.ticket_id) {
            return Err(StoreError::Unexpected(anyhow::anyhow!(
                "active ticket {} already has a check-in record",
                record.ticket_id
            )));
        }
        check_ins.insert(record.ticket_id, record.clone());
        ticket.status = TicketStatus::Used;
        ticket.updated_at = record.checked_in_at;
        Ok(Transition::Applied(record))
    }

    async fn cancel(
        &self,
        ticket_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Transition<IssuedTicket>> {
        let Some(cell) = self.ticket_cell(ticket_id).await else {
            return Ok(Transition::Missing);
        };
        let mut ticket = cell.lock().await;
        if !ticket.status.can_transition_to(TicketStatus::Cancelled) {
            return Ok(Transition::Rejected(ticket.status));
        }
        ticket.status = TicketStatus::Cancelled;
        ticket.updated_at = at;
        Ok(Transition::Applied(ticket.clone()))
    }

    async fn check_in_for_ticket(&self, ticket_id: Uuid) -> StoreResult<Option<CheckInRecord>> {
        Ok(self.check_ins.read().await.get(&ticket_id).cloned())
    }

    async fn check_ins_for_event(&self, event_id: Uuid) -> StoreResult<Vec<CheckInRecord>> {
        let mut records: Vec<CheckInRecord> = self
            .check_ins
            .read()
            .await
            .values()
            .filter(|record| record.event_id == event_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.checked_in_at.cmp(&b.checked_in_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn summary_for_event(&self, event_id: Uuid) -> StoreResult<CheckInSummary> {
        let mut summary = CheckInSummary::default();
        for cell in self.all_tickets().await {
            let ticket = cell.lock().await;
            if ticket.event_id != event_id {
                continue;
            }
            summary.issued += 1;
            match ticket.status {
                TicketStatus::Active => summary.active += 1,
                TicketStatus::Used => summary.checked_in += 1,
                TicketStatus::Cancelled => summary.cancelled += 1,
            }
        }
        Ok(summary)
    }
}

#[async_trait]
impl StaffStore for MemoryStore {
    async fn create_staff(
        &self,
        staff: StaffMember,
        credential: StaffCredential,
    ) -> StoreResult<StaffMember> {
        let mut members = self.staff.write().await;
        let taken = members
            .values()
            .any(|(m, _)| m.event_id == staff.event_id && m.email == staff.email);
        if taken {
            return Err(StoreError::Conflict(format!(
                "{} is already registered for this event",
                staff.email
            )));
        }
        members.insert(staff.id, (staff.clone(), credential));
        Ok(staff)
    }

    async fn get_staff(&self, id: Uuid) -> StoreResult<Option<StaffMember>> {
        Ok(self.staff.read().await.get(&id).map(|(m, _)| m.clone()))
    }

    async fn find_staff_login(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<(StaffMember, StaffCredential)>> {
        Ok(self
            .staff
            .read()
            .await
            .values()
            .find(|(m, _)| m.event_id == event_id && m.email == email)
            .cloned())
    }

    async fn list_staff(&self, event_id: Uuid) -> StoreResult<Vec<StaffMember>> {
        let mut members: Vec<StaffMember> = self
            .staff
            .read()
            .await
            .values()
            .filter(|(m, _)| m.event_id == event_id)
            .map(|(m, _)| m.clone())
            .collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(members)
    }

    async fn update_staff(&self, id: Uuid, patch: StaffPatch) -> StoreResult<Option<StaffMember>> {
        let mut members = self.staff.write().await;
        let Some((current, _)) = members.get(&id) else {
            return Ok(None);
        };
        let mut updated = current.clone();
        patch.apply(&mut updated);
        let taken = members.values().any(|(m, _)| {
            m.id != id && m.event_id == updated.event_id && m.email == updated.email
        });
        if taken {
            return Err(StoreError::Conflict(format!(
                "{} is already registered for this event",
                updated.email
            )));
        }
        if let Some((member, _)) = members.get_mut(&id) {
            *member = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        match self.staff.write().await.get_mut(&id) {
            Some((member, _)) => {
                member.last_login = Some(at);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("staff member {}", id))),
        }
    }
}

impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketCategory;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn ticket_type(quantity: u32) -> TicketType {
        let now = Utc::now();
        TicketType {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: "VIP".to_string(),
            description: None,
            price: Decimal::new(25000, 2),
            quantity,
            batch: "1º Lote".to_string(),
            category: TicketCategory::Vip,
            sales_start: now - Duration::days(1),
            sales_end: now + Duration::days(1),
            created_at: now,
        }
    }

    fn hold(tt: &TicketType, quantity: u32) -> Reservation {
        let now = Utc::now();
        Reservation::pending(tt.id, tt.event_id, quantity, now, now + Duration::minutes(15))
    }

    fn ticket_for(reservation: &Reservation, code: &str) -> IssuedTicket {
        let now = Utc::now();
        IssuedTicket {
            id: Uuid::new_v4(),
            ticket_type_id: reservation.ticket_type_id,
            event_id: reservation.event_id,
            reservation_id: reservation.id,
            owner_id: Uuid::new_v4(),
            code: code.to_string(),
            status: TicketStatus::Active,
            issued_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_reserve_is_compare_and_decrement() {
        let store = MemoryStore::new();
        let tt = store.create_ticket_type(ticket_type(3)).await.unwrap();

        assert!(store.reserve(&hold(&tt, 2)).await.unwrap());
        assert!(!store.reserve(&hold(&tt, 2)).await.unwrap());
        assert!(store.reserve(&hold(&tt, 1)).await.unwrap());

        let availability = store.availability(tt.id).await.unwrap().unwrap();
        assert_eq!(availability.remaining, 0);
        assert_eq!(availability.quantity, 3);
    }

    #[tokio::test]
    async fn test_release_restocks_once() {
        let store = MemoryStore::new();
        let tt = store.create_ticket_type(ticket_type(2)).await.unwrap();
        let reservation = hold(&tt, 2);
        store.reserve(&reservation).await.unwrap();

        let at = Utc::now();
        let released = store
            .release(reservation.id, ReservationStatus::Released, at)
            .await
            .unwrap();
        assert_eq!(released.unwrap().status, ReservationStatus::Released);
        assert!(store
            .release(reservation.id, ReservationStatus::Released, at)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.availability(tt.id).await.unwrap().unwrap().remaining, 2);
    }

    #[tokio::test]
    async fn test_confirm_rejects_duplicate_codes_without_side_effects() {
        let store = MemoryStore::new();
        let tt = store.create_ticket_type(ticket_type(4)).await.unwrap();
        let first = hold(&tt, 1);
        let second = hold(&tt, 2);
        store.reserve(&first).await.unwrap();
        store.reserve(&second).await.unwrap();
        let at = Utc::now();

        let outcome = store
            .confirm(first.id, Uuid::new_v4(), vec![ticket_for(&first, "SAME")], at)
            .await
            .unwrap();
        assert!(matches!(outcome, ConfirmOutcome::Committed(..)));

        let clash = store
            .confirm(
                second.id,
                Uuid::new_v4(),
                vec![ticket_for(&second, "SAME"), ticket_for(&second, "OTHER")],
                at,
            )
            .await
            .unwrap();
        assert_eq!(clash, ConfirmOutcome::DuplicateCode);
        assert!(!store.code_exists("OTHER").await.unwrap());

        let pending = store.get_reservation(second.id).await.unwrap().unwrap();
        assert_eq!(pending.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn test_cancelled_ticket_cannot_be_checked_in() {
        let store = MemoryStore::new();
        let tt = store.create_ticket_type(ticket_type(1)).await.unwrap();
        let reservation = hold(&tt, 1);
        store.reserve(&reservation).await.unwrap();
        let ticket = ticket_for(&reservation, "XYZ");
        let at = Utc::now();
        store
            .confirm(reservation.id, ticket.owner_id, vec![ticket.clone()], at)
            .await
            .unwrap();

        let cancelled = store.cancel(ticket.id, at).await.unwrap();
        assert!(matches!(cancelled, Transition::Applied(ref t) if t.status == TicketStatus::Cancelled));

        let record = CheckInRecord {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            staff_id: Uuid::new_v4(),
            event_id: ticket.event_id,
            checked_in_at: at,
        };
        assert_eq!(
            store.check_in(record).await.unwrap(),
            Transition::Rejected(TicketStatus::Cancelled)
        );
        assert!(store.check_in_for_ticket(ticket.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_quantity_keeps_remaining_within_quantity() {
        let store = MemoryStore::new();
        let tt = store.create_ticket_type(ticket_type(1)).await.unwrap();
        store.reserve(&hold(&tt, 1)).await.unwrap();

        let availability = store.add_quantity(tt.id, 5, 1_000).await.unwrap().unwrap();
        assert_eq!(availability.quantity, 6);
        assert_eq!(availability.remaining, 5);
        assert_eq!(store.get_ticket_type(tt.id).await.unwrap().unwrap().quantity, 6);
    }
}
