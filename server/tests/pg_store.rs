#![cfg(feature = "pg-tests")]

use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use uuid::Uuid;

use sanjapass_server::clock::{Clock, ManualClock};
use sanjapass_server::config::Config;
use sanjapass_server::crypto::OsSecureRandom;
use sanjapass_server::models::ticket::MAX_TICKET_QUANTITY;
use sanjapass_server::models::{
    IssuedTicket, NewEvent, NewStaffMember, NewTicketType, ReservationStatus, StaffMember,
    StaffRole, TicketCategory, TicketStatus,
};
use sanjapass_server::services::LogNotifier;
use sanjapass_server::state::AppState;
use sanjapass_server::store::postgres::PgStore;
use sanjapass_server::store::{ConfirmOutcome, InventoryStore, TicketStore};
use sanjapass_server::utils::error::AppError;

static PREPARED: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();

fn database_url() -> Option<String> {
    match std::env::var("SANJAPASS_TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("skipping pg-tests: set SANJAPASS_TEST_DATABASE_URL or DATABASE_URL");
            None
        }
    }
}

/// Migrates and empties the schema once per test binary.
async fn prepare(url: &str, store: &PgStore) -> Result<(), String> {
    PREPARED
        .get_or_try_init(|| async {
            store.migrate().await.map_err(|e| e.to_string())?;
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .connect(url)
                .await
                .map_err(|e| e.to_string())?;
            sqlx::query(
                "TRUNCATE check_ins, issued_tickets, reservations, staff_members, ticket_types, events",
            )
            .execute(&pool)
            .await
            .map_err(|e| e.to_string())?;
            Ok::<_, String>(())
        })
        .await
        .map(|_| ())
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Sweeps are global, so a sweeping test runs a year earlier than the others
/// and only ever reaches its own reservations.
fn sweep_start_time() -> DateTime<Utc> {
    start_time() - Duration::days(365)
}

struct PgHarness {
    store: Arc<PgStore>,
    clock: Arc<ManualClock>,
    state: AppState,
}

/// Each test gets its own pool; sqlx pools are bound to the runtime that opened them.
async fn pg_harness() -> Option<PgHarness> {
    pg_harness_at(start_time()).await
}

async fn pg_harness_at(start: DateTime<Utc>) -> Option<PgHarness> {
    let url = database_url()?;
    let store = match PgStore::connect(&url, 20).await {
        Ok(store) => store,
        Err(err) => {
            eprintln!("skipping pg-tests: cannot connect to postgres: {err}");
            return None;
        }
    };
    if let Err(err) = prepare(&url, &store).await {
        eprintln!("skipping pg-tests: cannot prepare schema: {err}");
        return None;
    }
    let store = Arc::new(store);
    let clock = Arc::new(ManualClock::new(start));
    let config = Config::from_lookup(|_| None).unwrap();
    let state = AppState::new(
        store.clone(),
        &config,
        clock.clone(),
        Arc::new(OsSecureRandom),
        Arc::new(LogNotifier),
    );
    Some(PgHarness {
        store,
        clock,
        state,
    })
}

impl PgHarness {
    /// A fresh event with one ticket type on sale.
    async fn ticket_type(&self, quantity: u32) -> (Uuid, Uuid) {
        let event = self
            .state
            .catalog
            .create_event(NewEvent {
                organizer_id: Uuid::new_v4(),
                title: "Lollapalooza".to_string(),
                description: None,
                location: "Autódromo de Interlagos, São Paulo".to_string(),
                category: "music".to_string(),
                start_time: self.clock.now() + Duration::days(60),
                end_time: None,
            })
            .await
            .unwrap();
        let view = self
            .state
            .catalog
            .create_ticket_type(
                event.id,
                NewTicketType {
                    name: "Pista Premium".to_string(),
                    description: None,
                    price: Decimal::new(89000, 2),
                    quantity,
                    batch: None,
                    category: TicketCategory::Standard,
                    sales_start: self.clock.now() - Duration::days(1),
                    sales_end: self.clock.now() + Duration::days(30),
                },
            )
            .await
            .unwrap();
        (event.id, view.ticket_type.id)
    }

    async fn remaining(&self, ticket_type_id: Uuid) -> u32 {
        self.state
            .ledger
            .availability(ticket_type_id)
            .await
            .unwrap()
            .remaining
    }

    async fn staff(&self, event_id: Uuid) -> StaffMember {
        self.state
            .staff
            .create_staff(
                event_id,
                NewStaffMember {
                    name: "Ana Souza".to_string(),
                    email: format!("{}@staff.sanjapass.com", Uuid::new_v4().simple()),
                    phone: None,
                    role: StaffRole::Operator,
                },
            )
            .await
            .unwrap()
    }

    fn ticket(
        &self,
        ticket_type_id: Uuid,
        event_id: Uuid,
        reservation_id: Uuid,
        code: &str,
    ) -> IssuedTicket {
        let now = self.clock.now();
        IssuedTicket {
            id: Uuid::new_v4(),
            ticket_type_id,
            event_id,
            reservation_id,
            owner_id: Uuid::new_v4(),
            code: code.to_string(),
            status: TicketStatus::Active,
            issued_at: now,
            updated_at: now,
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn pg_concurrent_reserves_never_oversell() {
    let Some(h) = pg_harness().await else {
        return;
    };
    let h = Arc::new(h);
    let (_, ticket_type_id) = h.ticket_type(10).await;

    let attempts = (0..40).map(|_| {
        let h = h.clone();
        tokio::spawn(async move { h.state.ledger.reserve(ticket_type_id, 1).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let granted = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::OutOfStock { .. })))
        .count();
    assert_eq!(granted, 10);
    assert_eq!(refused, 30);
    assert_eq!(h.remaining(ticket_type_id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn pg_concurrent_check_ins_admit_one() {
    let Some(h) = pg_harness().await else {
        return;
    };
    let h = Arc::new(h);
    let (event_id, ticket_type_id) = h.ticket_type(5).await;
    let reservation = h.state.ledger.reserve(ticket_type_id, 1).await.unwrap();
    let ticket = h
        .state
        .ledger
        .confirm(reservation.id, Uuid::new_v4())
        .await
        .unwrap()
        .tickets
        .remove(0);

    let mut staff = Vec::new();
    for _ in 0..20 {
        staff.push(h.staff(event_id).await);
    }
    let scans = staff.into_iter().map(|member| {
        let h = h.clone();
        let code = ticket.code.clone();
        tokio::spawn(async move { h.state.checkins.check_in(&code, member.id).await })
    });
    let results: Vec<_> = join_all(scans)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(AppError::AlreadyUsed(id)) if *id == ticket.id))
            .count(),
        19
    );
    assert_eq!(h.state.checkins.history(event_id).await.unwrap().len(), 1);
    let stored = h.store.get_ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Used);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pg_repeated_confirm_returns_the_same_tickets() {
    let Some(h) = pg_harness().await else {
        return;
    };
    let h = Arc::new(h);
    let (_, ticket_type_id) = h.ticket_type(10).await;
    let reservation = h.state.ledger.reserve(ticket_type_id, 3).await.unwrap();
    let purchaser = Uuid::new_v4();

    let first = h.state.ledger.confirm(reservation.id, purchaser).await.unwrap();
    assert_eq!(first.tickets.len(), 3);

    let again = join_all((0..8).map(|_| {
        let h = h.clone();
        tokio::spawn(async move { h.state.ledger.confirm(reservation.id, purchaser).await })
    }))
    .await;
    for result in again {
        let confirmation = result.unwrap().unwrap();
        assert_eq!(confirmation.tickets, first.tickets);
    }
    assert_eq!(h.store.tickets_for_owner(purchaser).await.unwrap().len(), 3);
    assert_eq!(h.remaining(ticket_type_id).await, 7);
}

#[tokio::test]
async fn pg_confirm_after_ttl_expires_and_restocks() {
    let Some(h) = pg_harness().await else {
        return;
    };
    let (_, ticket_type_id) = h.ticket_type(4).await;
    let reservation = h.state.ledger.reserve(ticket_type_id, 4).await.unwrap();
    assert_eq!(h.remaining(ticket_type_id).await, 0);

    h.clock.advance(Duration::minutes(16));
    let result = h.state.ledger.confirm(reservation.id, Uuid::new_v4()).await;

    assert!(matches!(result, Err(AppError::TokenExpired(id)) if id == reservation.id));
    assert_eq!(h.remaining(ticket_type_id).await, 4);
    let stored = h.state.ledger.get_reservation(reservation.id).await.unwrap();
    assert_eq!(stored.status, ReservationStatus::Expired);
    assert!(matches!(
        h.state.ledger.confirm(reservation.id, Uuid::new_v4()).await,
        Err(AppError::TokenExpired(_))
    ));
}

#[tokio::test]
async fn pg_sweep_releases_overdue_reservations() {
    let Some(h) = pg_harness_at(sweep_start_time()).await else {
        return;
    };
    let (_, ticket_type_id) = h.ticket_type(6).await;
    let overdue = h.state.ledger.reserve(ticket_type_id, 2).await.unwrap();
    h.clock.advance(Duration::minutes(16));
    let fresh = h.state.ledger.reserve(ticket_type_id, 1).await.unwrap();

    assert_eq!(h.state.ledger.sweep_expired().await.unwrap(), 1);

    assert_eq!(
        h.state.ledger.get_reservation(overdue.id).await.unwrap().status,
        ReservationStatus::Expired
    );
    assert_eq!(
        h.state.ledger.get_reservation(fresh.id).await.unwrap().status,
        ReservationStatus::Pending
    );
    assert_eq!(h.remaining(ticket_type_id).await, 5);
}

#[tokio::test]
async fn pg_duplicate_code_leaves_reservation_pending() {
    let Some(h) = pg_harness().await else {
        return;
    };
    let (event_id, ticket_type_id) = h.ticket_type(5).await;
    let code = format!("PG{}", Uuid::new_v4().simple());

    let taken = h.state.ledger.reserve(ticket_type_id, 1).await.unwrap();
    let original = h.ticket(ticket_type_id, event_id, taken.id, &code);
    let outcome = h
        .store
        .confirm(taken.id, original.owner_id, vec![original], h.clock.now())
        .await
        .unwrap();
    assert!(matches!(outcome, ConfirmOutcome::Committed(..)));

    let clashing = h.state.ledger.reserve(ticket_type_id, 2).await.unwrap();
    let tickets = vec![
        h.ticket(
            ticket_type_id,
            event_id,
            clashing.id,
            &format!("PG{}", Uuid::new_v4().simple()),
        ),
        h.ticket(ticket_type_id, event_id, clashing.id, &code),
    ];
    let buyer = Uuid::new_v4();
    let outcome = h
        .store
        .confirm(clashing.id, buyer, tickets, h.clock.now())
        .await
        .unwrap();

    assert_eq!(outcome, ConfirmOutcome::DuplicateCode);
    assert_eq!(
        h.state.ledger.get_reservation(clashing.id).await.unwrap().status,
        ReservationStatus::Pending
    );
    assert!(h.store.tickets_for_owner(buyer).await.unwrap().is_empty());
    assert_eq!(h.remaining(ticket_type_id).await, 2);
}

#[tokio::test]
async fn pg_increase_quantity_stops_at_the_ticket_cap() {
    let Some(h) = pg_harness().await else {
        return;
    };
    let (_, ticket_type_id) = h.ticket_type(MAX_TICKET_QUANTITY - 3).await;

    let availability = h.state.ledger.increase_quantity(ticket_type_id, 3).await.unwrap();
    assert_eq!(availability.quantity, MAX_TICKET_QUANTITY);

    assert!(matches!(
        h.state.ledger.increase_quantity(ticket_type_id, 1).await,
        Err(AppError::ValidationError(_))
    ));
    let after = h.store.availability(ticket_type_id).await.unwrap().unwrap();
    assert_eq!(after.quantity, MAX_TICKET_QUANTITY);
    assert_eq!(after.remaining, MAX_TICKET_QUANTITY);
}
