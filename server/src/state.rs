use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Config;
use crate::crypto::SecureRandom;
use crate::services::{
    CheckInValidator, CredentialNotifier, InventoryLedger, PurchaseIssuer, StaffDirectory,
    TicketCatalog,
};
use crate::store::Store;

/// Shared handles the router hands to every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: TicketCatalog,
    pub ledger: InventoryLedger,
    pub checkins: CheckInValidator,
    pub staff: StaffDirectory,
    pub backend: &'static str,
}

impl AppState {
    pub fn new<S: Store>(
        store: Arc<S>,
        config: &Config,
        clock: Arc<dyn Clock>,
        rng: Arc<dyn SecureRandom>,
        notifier: Arc<dyn CredentialNotifier>,
    ) -> Self {
        let staff = StaffDirectory::new(
            store.clone(),
            store.clone(),
            rng.clone(),
            notifier,
            clock.clone(),
        );
        let issuer = PurchaseIssuer::new(store.clone(), rng, clock.clone());
        let ttl = chrono::Duration::from_std(config.reservation_ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));

        Self {
            catalog: TicketCatalog::new(store.clone(), store.clone(), clock.clone()),
            ledger: InventoryLedger::new(
                store.clone(),
                store.clone(),
                issuer,
                clock.clone(),
                ttl,
                config.max_tickets_per_reservation,
            ),
            checkins: CheckInValidator::new(store.clone(), staff.clone(), clock),
            staff,
            backend: store.backend_name(),
        }
    }
}
