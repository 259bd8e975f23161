use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::ticket::MAX_TICKET_QUANTITY;
use crate::models::{Availability, IssuedTicket, Reservation, ReservationStatus};
use crate::services::issuer::PurchaseIssuer;
use crate::store::{CatalogStore, ConfirmOutcome, InventoryStore, StoreError};
use crate::utils::error::AppError;

/// Code collisions at commit time are retried this many times before giving up.
const MAX_CONFIRM_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub reservation: Reservation,
    pub tickets: Vec<IssuedTicket>,
}

impl Confirmation {
    fn new(reservation: Reservation, mut tickets: Vec<IssuedTicket>) -> Self {
        tickets.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then(a.id.cmp(&b.id)));
        Self {
            reservation,
            tickets,
        }
    }
}

/// Owns the `remaining` count of every ticket type. All stock movement goes
/// through reserve, release, confirm-by-expiry and explicit increases.
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn InventoryStore>,
    catalog: Arc<dyn CatalogStore>,
    issuer: PurchaseIssuer,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_per_reservation: u32,
}

impl InventoryLedger {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        catalog: Arc<dyn CatalogStore>,
        issuer: PurchaseIssuer,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        max_per_reservation: u32,
    ) -> Self {
        Self {
            store,
            catalog,
            issuer,
            clock,
            ttl,
            max_per_reservation,
        }
    }

    pub async fn reserve(
        &self,
        ticket_type_id: Uuid,
        quantity: u32,
    ) -> Result<Reservation, AppError> {
        if quantity == 0 || quantity > self.max_per_reservation {
            return Err(AppError::ValidationError(format!(
                "quantity must be between 1 and {}",
                self.max_per_reservation
            )));
        }

        let ticket_type = self
            .catalog
            .get_ticket_type(ticket_type_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Ticket type '{}' was not found", ticket_type_id))
            })?;

        let now = self.clock.now();
        if !ticket_type.on_sale_at(now) {
            return Err(AppError::SalesClosed(ticket_type_id));
        }

        let reservation = Reservation::pending(
            ticket_type.id,
            ticket_type.event_id,
            quantity,
            now,
            now + self.ttl,
        );

        match self.store.reserve(&reservation).await {
            Ok(true) => {
                info!(
                    reservation_id = %reservation.id,
                    ticket_type_id = %ticket_type_id,
                    quantity,
                    expires_at = %reservation.expires_at,
                    "Tickets reserved"
                );
                Ok(reservation)
            }
            Ok(false) => {
                let remaining = self
                    .store
                    .availability(ticket_type_id)
                    .await?
                    .map(|a| a.remaining)
                    .unwrap_or(0);
                Err(AppError::OutOfStock {
                    ticket_type_id,
                    requested: quantity,
                    remaining,
                })
            }
            Err(StoreError::NotFound(_)) => Err(AppError::NotFound(format!(
                "Ticket type '{}' was not found",
                ticket_type_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_reservation(&self, token: Uuid) -> Result<Reservation, AppError> {
        self.store
            .get_reservation(token)
            .await?
            .ok_or(AppError::TokenNotFound(token))
    }

    pub async fn release(&self, token: Uuid) -> Result<Reservation, AppError> {
        let released = self
            .store
            .release(token, ReservationStatus::Released, self.clock.now())
            .await?
            .ok_or(AppError::TokenNotFound(token))?;
        info!(
            reservation_id = %token,
            quantity = released.quantity,
            "Reservation released"
        );
        Ok(released)
    }

    /// Safe to call repeatedly: later calls return the tickets of the first.
    pub async fn confirm(&self, token: Uuid, purchaser_id: Uuid) -> Result<Confirmation, AppError> {
        for attempt in 1..=MAX_CONFIRM_ATTEMPTS {
            let reservation = self.get_reservation(token).await?;
            let now = self.clock.now();

            let tickets = if reservation.status == ReservationStatus::Pending
                && !reservation.is_expired_at(now)
            {
                self.issuer.issue(&reservation, purchaser_id).await?
            } else {
                Vec::new()
            };

            match self.store.confirm(token, purchaser_id, tickets, now).await? {
                ConfirmOutcome::Committed(reservation, tickets) => {
                    info!(
                        reservation_id = %token,
                        purchaser_id = %purchaser_id,
                        tickets = tickets.len(),
                        "Reservation confirmed"
                    );
                    return Ok(Confirmation::new(reservation, tickets));
                }
                ConfirmOutcome::AlreadyConfirmed(reservation, tickets) => {
                    if reservation.purchaser_id != Some(purchaser_id) {
                        warn!(
                            reservation_id = %token,
                            purchaser_id = %purchaser_id,
                            "Confirmation repeated by a different purchaser"
                        );
                    }
                    return Ok(Confirmation::new(reservation, tickets));
                }
                ConfirmOutcome::NotPending(status) => {
                    debug!(reservation_id = %token, status = %status, "Reservation not confirmable");
                    return Err(AppError::TokenExpired(token));
                }
                ConfirmOutcome::NotFound => return Err(AppError::TokenNotFound(token)),
                ConfirmOutcome::DuplicateCode => {
                    warn!(reservation_id = %token, attempt, "Ticket code taken at commit, reissuing");
                }
            }
        }

        Err(AppError::InternalServerError(format!(
            "could not commit unique ticket codes for reservation {}",
            token
        )))
    }

    /// Releases every pending reservation past its deadline. Returns how many.
    pub async fn sweep_expired(&self) -> Result<usize, AppError> {
        let now = self.clock.now();
        let mut released = 0;
        for id in self.store.expired_reservations(now).await? {
            // a confirm or release may have resolved it since the scan
            if self
                .store
                .release(id, ReservationStatus::Expired, now)
                .await?
                .is_some()
            {
                released += 1;
            }
        }
        if released > 0 {
            info!(released, "Expired reservations returned to stock");
        }
        Ok(released)
    }

    pub async fn availability(&self, ticket_type_id: Uuid) -> Result<Availability, AppError> {
        self.store
            .availability(ticket_type_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Ticket type '{}' was not found", ticket_type_id))
            })
    }

    pub async fn increase_quantity(
        &self,
        ticket_type_id: Uuid,
        additional: u32,
    ) -> Result<Availability, AppError> {
        if additional == 0 {
            return Err(AppError::ValidationError(
                "additional quantity must be positive".to_string(),
            ));
        }
        if additional > MAX_TICKET_QUANTITY {
            return Err(AppError::ValidationError(format!(
                "additional quantity must not exceed {}",
                MAX_TICKET_QUANTITY
            )));
        }
        let availability = match self
            .store
            .add_quantity(ticket_type_id, additional, MAX_TICKET_QUANTITY)
            .await
        {
            Ok(Some(availability)) => availability,
            Ok(None) => {
                return Err(AppError::NotFound(format!(
                    "Ticket type '{}' was not found",
                    ticket_type_id
                )))
            }
            Err(StoreError::Conflict(reason)) => {
                return Err(AppError::ValidationError(format!(
                    "ticket quantity is capped at {}: {}",
                    MAX_TICKET_QUANTITY, reason
                )))
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            ticket_type_id = %ticket_type_id,
            additional,
            quantity = availability.quantity,
            remaining = availability.remaining,
            "Ticket quantity increased"
        );
        Ok(availability)
    }
}

pub fn spawn_expiry_sweeper(
    ledger: InventoryLedger,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = ledger.sweep_expired().await {
                warn!(error = %e, "Reservation sweep failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::crypto::{OsSecureRandom, SecureRandom};
    use crate::models::{NewTicketType, TicketCategory};
    use crate::store::memory::MemoryStore;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    /// Replays the same bytes for the first `repeats` draws, then counts up.
    struct ReplayRandom {
        draws: Mutex<u32>,
        repeats: u32,
    }

    impl SecureRandom for ReplayRandom {
        fn fill_bytes(&self, dest: &mut [u8]) {
            let mut draws = self.draws.lock().unwrap();
            *draws += 1;
            let seed = if *draws <= self.repeats { 0 } else { *draws };
            dest.fill(0);
            dest[..4].copy_from_slice(&seed.to_be_bytes());
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        ledger: InventoryLedger,
        ticket_type_id: Uuid,
    }

    async fn fixture(quantity: u32, rng: Arc<dyn SecureRandom>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let ticket_type = NewTicketType {
            name: "Pista".to_string(),
            description: None,
            price: Decimal::new(12000, 2),
            quantity,
            batch: None,
            category: TicketCategory::Standard,
            sales_start: clock.now() - Duration::days(1),
            sales_end: clock.now() + Duration::days(30),
        }
        .into_ticket_type(Uuid::new_v4(), Uuid::new_v4(), clock.now());
        let ticket_type_id = ticket_type.id;
        store.create_ticket_type(ticket_type).await.unwrap();

        let issuer = PurchaseIssuer::new(store.clone(), rng, clock.clone());
        let ledger = InventoryLedger::new(
            store.clone(),
            store.clone(),
            issuer,
            clock.clone(),
            Duration::minutes(15),
            10,
        );
        Fixture {
            store,
            clock,
            ledger,
            ticket_type_id,
        }
    }

    #[tokio::test]
    async fn test_reserve_rejects_zero_and_oversized_quantities() {
        let f = fixture(50, Arc::new(OsSecureRandom)).await;
        assert!(matches!(
            f.ledger.reserve(f.ticket_type_id, 0).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            f.ledger.reserve(f.ticket_type_id, 11).await,
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(f.ledger.availability(f.ticket_type_id).await.unwrap().remaining, 50);
    }

    #[tokio::test]
    async fn test_out_of_stock_reports_what_is_left() {
        let f = fixture(3, Arc::new(OsSecureRandom)).await;
        f.ledger.reserve(f.ticket_type_id, 2).await.unwrap();

        match f.ledger.reserve(f.ticket_type_id, 2).await {
            Err(AppError::OutOfStock {
                requested,
                remaining,
                ..
            }) => {
                assert_eq!(requested, 2);
                assert_eq!(remaining, 1);
            }
            other => panic!("expected OutOfStock, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_confirm_never_reuses_an_issued_code() {
        let f = fixture(5, Arc::new(OsSecureRandom)).await;
        // occupy the code the replaying source will hand out first
        let first = f.ledger.reserve(f.ticket_type_id, 1).await.unwrap();
        let replay = Arc::new(ReplayRandom {
            draws: Mutex::new(0),
            repeats: 1,
        });
        let taken = crate::crypto::ticket_code(replay.as_ref());
        let mut ticket = PurchaseIssuer::new(
            f.store.clone(),
            Arc::new(OsSecureRandom),
            f.clock.clone(),
        )
        .issue(&first, Uuid::new_v4())
        .await
        .unwrap()
        .remove(0);
        ticket.code = taken.clone();
        f.store
            .confirm(first.id, ticket.owner_id, vec![ticket], f.clock.now())
            .await
            .unwrap();

        let ledger = InventoryLedger::new(
            f.store.clone(),
            f.store.clone(),
            PurchaseIssuer::new(
                f.store.clone(),
                Arc::new(ReplayRandom {
                    draws: Mutex::new(0),
                    repeats: 1,
                }),
                f.clock.clone(),
            ),
            f.clock.clone(),
            Duration::minutes(15),
            10,
        );
        let second = ledger.reserve(f.ticket_type_id, 1).await.unwrap();
        let confirmation = ledger.confirm(second.id, Uuid::new_v4()).await.unwrap();

        assert_eq!(confirmation.tickets.len(), 1);
        assert_ne!(confirmation.tickets[0].code, taken);
    }

    #[tokio::test]
    async fn test_sweep_skips_reservations_still_inside_ttl() {
        let f = fixture(10, Arc::new(OsSecureRandom)).await;
        f.ledger.reserve(f.ticket_type_id, 4).await.unwrap();
        f.clock.advance(Duration::minutes(14));

        assert_eq!(f.ledger.sweep_expired().await.unwrap(), 0);
        assert_eq!(f.ledger.availability(f.ticket_type_id).await.unwrap().remaining, 6);

        f.clock.advance(Duration::minutes(1));
        assert_eq!(f.ledger.sweep_expired().await.unwrap(), 1);
        assert_eq!(f.ledger.availability(f.ticket_type_id).await.unwrap().remaining, 10);
    }

    #[tokio::test]
    async fn test_reserve_outside_sales_window_is_rejected() {
        let f = fixture(10, Arc::new(OsSecureRandom)).await;
        f.clock.advance(Duration::days(31));

        assert!(matches!(
            f.ledger.reserve(f.ticket_type_id, 1).await,
            Err(AppError::SalesClosed(id)) if id == f.ticket_type_id
        ));
    }

    #[tokio::test]
    async fn test_increase_quantity_raises_both_counts() {
        let f = fixture(10, Arc::new(OsSecureRandom)).await;
        f.ledger.reserve(f.ticket_type_id, 3).await.unwrap();

        let availability = f.ledger.increase_quantity(f.ticket_type_id, 5).await.unwrap();

        assert_eq!(availability.quantity, 15);
        assert_eq!(availability.remaining, 12);
        assert!(matches!(
            f.ledger.increase_quantity(f.ticket_type_id, 0).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_increase_quantity_stops_at_the_ticket_cap() {
        let f = fixture(MAX_TICKET_QUANTITY - 5, Arc::new(OsSecureRandom)).await;

        let availability = f.ledger.increase_quantity(f.ticket_type_id, 5).await.unwrap();
        assert_eq!(availability.quantity, MAX_TICKET_QUANTITY);
        assert_eq!(availability.remaining, MAX_TICKET_QUANTITY);

        assert!(matches!(
            f.ledger.increase_quantity(f.ticket_type_id, 1).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            f.ledger.increase_quantity(f.ticket_type_id, u32::MAX).await,
            Err(AppError::ValidationError(_))
        ));
        let after = f.ledger.availability(f.ticket_type_id).await.unwrap();
        assert_eq!(after.quantity, MAX_TICKET_QUANTITY);
        assert_eq!(after.remaining, MAX_TICKET_QUANTITY);
    }

    #[tokio::test]
    async fn test_increase_quantity_on_unknown_type_is_not_found() {
        let f = fixture(1, Arc::new(OsSecureRandom)).await;
        assert!(matches!(
            f.ledger.increase_quantity(Uuid::new_v4(), 1).await,
            Err(AppError::NotFound(_))
        ));
    }
}
