use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::clock::Clock;
use crate::crypto::{self, SecureRandom};
use crate::models::{IssuedTicket, Reservation, TicketStatus};
use crate::store::TicketStore;
use crate::utils::error::AppError;

/// Turns a reservation into one ticket per unit, each carrying a fresh code.
#[derive(Clone)]
pub struct PurchaseIssuer {
    tickets: Arc<dyn TicketStore>,
    rng: Arc<dyn SecureRandom>,
    clock: Arc<dyn Clock>,
}

impl PurchaseIssuer {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        rng: Arc<dyn SecureRandom>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tickets,
            rng,
            clock,
        }
    }

    /// Codes are checked against the persistent index here; the store's unique
    /// constraint still has the last word when the tickets are committed.
    pub async fn issue(
        &self,
        reservation: &Reservation,
        purchaser_id: Uuid,
    ) -> Result<Vec<IssuedTicket>, AppError> {
        let wanted = reservation.quantity as usize;
        let max_draws = wanted * 4 + 8;
        let issued_at = self.clock.now();
        let mut codes = HashSet::with_capacity(wanted);
        let mut draws = 0;

        while codes.len() < wanted {
            if draws == max_draws {
                return Err(AppError::InternalServerError(format!(
                    "could not draw {} unique ticket codes",
                    wanted
                )));
            }
            draws += 1;

            let code = crypto::ticket_code(self.rng.as_ref());
            if codes.contains(&code) || self.tickets.code_exists(&code).await? {
                warn!(reservation_id = %reservation.id, "Ticket code collision, drawing again");
                continue;
            }
            codes.insert(code);
        }

        Ok(codes
            .into_iter()
            .map(|code| IssuedTicket {
                id: Uuid::new_v4(),
                ticket_type_id: reservation.ticket_type_id,
                event_id: reservation.event_id,
                reservation_id: reservation.id,
                owner_id: purchaser_id,
                code,
                status: TicketStatus::Active,
                issued_at,
                updated_at: issued_at,
            })
            .collect())
    }
}
