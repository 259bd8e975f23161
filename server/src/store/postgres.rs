//! PostgreSQL backend.
//!
//! Contended mutations are single conditional statements or short
//! transactions:
//! - reserve: `UPDATE ticket_types SET remaining = remaining - n WHERE remaining >= n`
//!   then insert the reservation, in one transaction,
//! - release/expire/confirm: the reservation row is locked (`FOR UPDATE`) or
//!   moved with a `WHERE status = 'pending'` guard,
//! - check-in/cancel: `UPDATE issued_tickets ... WHERE status = 'active'`.
//!
//! `issued_tickets.code` and `check_ins.ticket_id` carry unique indexes, so a
//! duplicate code or a second check-in cannot be committed even by a buggy
//! caller. Database URLs can carry credentials and are never logged here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::{
    CatalogStore, ConfirmOutcome, InventoryStore, StaffStore, Store, StoreError, StoreResult,
    TicketStore, Transition,
};
use crate::models::{
    Availability, CheckInRecord, CheckInSummary, Event, IssuedTicket, Reservation,
    ReservationStatus, StaffCredential, StaffMember, StaffPatch, TicketStatus, TicketType,
};

macro_rules! event_columns {
    () => {
        "id, organizer_id, title, description, location, category, start_time, end_time, created_at, updated_at"
    };
}

macro_rules! ticket_type_columns {
    () => {
        "id, event_id, name, description, price, quantity, batch, category, sales_start, sales_end, created_at"
    };
}

macro_rules! reservation_columns {
    () => {
        "id, ticket_type_id, event_id, quantity, status, purchaser_id, created_at, expires_at, resolved_at"
    };
}

macro_rules! ticket_columns {
    () => {
        "id, ticket_type_id, event_id, reservation_id, owner_id, code, status, issued_at, updated_at"
    };
}

macro_rules! staff_columns {
    () => {
        "id, event_id, name, email, phone, role, is_active, created_at, last_login"
    };
}

macro_rules! check_in_columns {
    () => {
        "id, ticket_id, staff_id, event_id, checked_in_at"
    };
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unexpected(e.into()))
    }
}

fn db_count(value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|e| StoreError::Unexpected(e.into()))
}

fn app_count(value: i32) -> StoreResult<u32> {
    u32::try_from(value).map_err(|e| StoreError::Unexpected(e.into()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_foreign_key_violation())
        .unwrap_or(false)
}

fn parse_status(text: &str) -> StoreResult<TicketStatus> {
    text.parse::<TicketStatus>()
        .map_err(|e| StoreError::Unexpected(e.into()))
}

async fn restock(conn: &mut PgConnection, reservation: &Reservation) -> StoreResult<()> {
    sqlx::query("UPDATE ticket_types SET remaining = remaining + $2 WHERE id = $1")
        .bind(reservation.ticket_type_id)
        .bind(db_count(reservation.quantity)?)
        .execute(conn)
        .await?;
    Ok(())
}

async fn tickets_of_reservation(
    conn: &mut PgConnection,
    reservation_id: Uuid,
) -> StoreResult<Vec<IssuedTicket>> {
    let tickets = sqlx::query_as::<_, IssuedTicket>(concat!(
        "SELECT ",
        ticket_columns!(),
        " FROM issued_tickets WHERE reservation_id = $1 ORDER BY issued_at, id"
    ))
    .bind(reservation_id)
    .fetch_all(conn)
    .await?;
    Ok(tickets)
}

async fn ticket_status(conn: &mut PgConnection, ticket_id: Uuid) -> StoreResult<Option<TicketStatus>> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM issued_tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(conn)
            .await?;
    status.as_deref().map(parse_status).transpose()
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        let insert = sqlx::query(concat!(
            "INSERT INTO events (",
            event_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.category)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await;
        match insert {
            Ok(_) => Ok(event),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict(format!("event {} exists", event.id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events ORDER BY start_time, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn create_ticket_type(&self, ticket_type: TicketType) -> StoreResult<TicketType> {
        let insert = sqlx::query(concat!(
            "INSERT INTO ticket_types (",
            ticket_type_columns!(),
            ", remaining) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $6)"
        ))
        .bind(ticket_type.id)
        .bind(ticket_type.event_id)
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.price)
        .bind(db_count(ticket_type.quantity)?)
        .bind(&ticket_type.batch)
        .bind(ticket_type.category.as_str())
        .bind(ticket_type.sales_start)
        .bind(ticket_type.sales_end)
        .bind(ticket_type.created_at)
        .execute(&self.pool)
        .await;
        match insert {
            Ok(_) => Ok(ticket_type),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(format!(
                "ticket type {} exists",
                ticket_type.id
            ))),
            Err(err) if is_foreign_key_violation(&err) => Err(StoreError::NotFound(format!(
                "event {}",
                ticket_type.event_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_ticket_type(&self, id: Uuid) -> StoreResult<Option<TicketType>> {
        let ticket_type = sqlx::query_as::<_, TicketType>(concat!(
            "SELECT ",
            ticket_type_columns!(),
            " FROM ticket_types WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket_type)
    }

    async fn list_ticket_types(&self, event_id: Uuid) -> StoreResult<Vec<TicketType>> {
        let ticket_types = sqlx::query_as::<_, TicketType>(concat!(
            "SELECT ",
            ticket_type_columns!(),
            " FROM ticket_types WHERE event_id = $1 ORDER BY created_at, name"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ticket_types)
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn availability(&self, ticket_type_id: Uuid) -> StoreResult<Option<Availability>> {
        let row: Option<(i32, i32)> =
            sqlx::query_as("SELECT quantity, remaining FROM ticket_types WHERE id = $1")
                .bind(ticket_type_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(quantity, remaining)| {
            Ok(Availability {
                ticket_type_id,
                quantity: app_count(quantity)?,
                remaining: app_count(remaining)?,
            })
        })
        .transpose()
    }

    async fn add_quantity(
        &self,
        ticket_type_id: Uuid,
        additional: u32,
        cap: u32,
    ) -> StoreResult<Option<Availability>> {
        let (Ok(additional_db), Ok(cap_db)) = (i32::try_from(additional), i32::try_from(cap)) else {
            return Err(StoreError::Conflict(format!(
                "additional quantity {} exceeds {}",
                additional, cap
            )));
        };
        // widened to BIGINT so the guard itself cannot overflow
        let row: Option<(i32, i32)> = sqlx::query_as(
            "UPDATE ticket_types SET quantity = quantity + $2, remaining = remaining + $2 \
             WHERE id = $1 AND quantity::BIGINT + $2 <= $3 RETURNING quantity, remaining",
        )
        .bind(ticket_type_id)
        .bind(additional_db)
        .bind(i64::from(cap_db))
        .fetch_optional(&self.pool)
        .await?;

        let Some((quantity, remaining)) = row else {
            return match self.availability(ticket_type_id).await? {
                Some(current) => Err(StoreError::Conflict(format!(
                    "quantity {} plus {} would exceed {}",
                    current.quantity, additional, cap
                ))),
                None => Ok(None),
            };
        };
        Ok(Some(Availability {
            ticket_type_id,
            quantity: app_count(quantity)?,
            remaining: app_count(remaining)?,
        }))
    }

    async fn reserve(&self, reservation: &Reservation) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let taken = sqlx::query(
            "UPDATE ticket_types SET remaining = remaining - $2 WHERE id = $1 AND remaining >= $2",
        )
        .bind(reservation.ticket_type_id)
        .bind(db_count(reservation.quantity)?)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ticket_types WHERE id = $1)")
                    .bind(reservation.ticket_type_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !exists {
                return Err(StoreError::NotFound(format!(
                    "ticket type {}",
                    reservation.ticket_type_id
                )));
            }
            return Ok(false);
        }

        sqlx::query(concat!(
            "INSERT INTO reservations (",
            reservation_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(reservation.id)
        .bind(reservation.ticket_type_id)
        .bind(reservation.event_id)
        .bind(db_count(reservation.quantity)?)
        .bind(reservation.status.as_str())
        .bind(reservation.purchaser_id)
        .bind(reservation.created_at)
        .bind(reservation.expires_at)
        .bind(reservation.resolved_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get_reservation(&self, id: Uuid) -> StoreResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(concat!(
            "SELECT ",
            reservation_columns!(),
            " FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    async fn release(
        &self,
        id: Uuid,
        to: ReservationStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Reservation>> {
        let mut tx = self.pool.begin().await?;
        let released = sqlx::query_as::<_, Reservation>(concat!(
            "UPDATE reservations SET status = $2, resolved_at = $3 \
             WHERE id = $1 AND status = 'pending' RETURNING ",
            reservation_columns!()
        ))
        .bind(id)
        .bind(to.as_str())
        .bind(at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(reservation) = released else {
            return Ok(None);
        };
        restock(&mut tx, &reservation).await?;
        tx.commit().await?;
        Ok(Some(reservation))
    }

    async fn confirm(
        &self,
        id: Uuid,
        purchaser_id: Uuid,
        tickets: Vec<IssuedTicket>,
        at: DateTime<Utc>,
    ) -> StoreResult<ConfirmOutcome> {
        let mut tx = self.pool.begin().await?;
        let locked = sqlx::query_as::<_, Reservation>(concat!(
            "SELECT ",
            reservation_columns!(),
            " FROM reservations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(reservation) = locked else {
            return Ok(ConfirmOutcome::NotFound);
        };

        match reservation.status {
            ReservationStatus::Confirmed => {
                let issued = tickets_of_reservation(&mut tx, id).await?;
                tx.commit().await?;
                return Ok(ConfirmOutcome::AlreadyConfirmed(reservation, issued));
            }
            ReservationStatus::Released | ReservationStatus::Expired => {
                return Ok(ConfirmOutcome::NotPending(reservation.status));
            }
            ReservationStatus::Pending if reservation.expires_at <= at => {
                sqlx::query(
                    "UPDATE reservations SET status = 'expired', resolved_at = $2 WHERE id = $1",
                )
                .bind(id)
                .bind(at)
                .execute(&mut *tx)
                .await?;
                restock(&mut tx, &reservation).await?;
                tx.commit().await?;
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

        for ticket in &tickets {
            let insert = sqlx::query(concat!(
                "INSERT INTO issued_tickets (",
                ticket_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            ))
            .bind(ticket.id)
            .bind(ticket.ticket_type_id)
            .bind(ticket.event_id)
            .bind(ticket.reservation_id)
            .bind(ticket.owner_id)
            .bind(&ticket.code)
            .bind(ticket.status.as_str())
            .bind(ticket.issued_at)
            .bind(ticket.updated_at)
            .execute(&mut *tx)
            .await;
            match insert {
                Ok(_) => {}
                // dropping `tx` rolls back the tickets inserted so far
                Err(err) if is_unique_violation(&err) => return Ok(ConfirmOutcome::DuplicateCode),
                Err(err) => return Err(err.into()),
            }
        }

        let confirmed = sqlx::query_as::<_, Reservation>(concat!(
            "UPDATE reservations SET status = 'confirmed', purchaser_id = $2, resolved_at = $3 \
             WHERE id = $1 RETURNING ",
            reservation_columns!()
        ))
        .bind(id)
        .bind(purchaser_id)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ConfirmOutcome::Committed(confirmed, tickets))
    }

    async fn expired_reservations(&self, now: DateTime<Utc>) -> StoreResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar(
            "SELECT id FROM reservations WHERE status = 'pending' AND expires_at <= $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn code_exists(&self, code: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM issued_tickets WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<IssuedTicket>> {
        let ticket = sqlx::query_as::<_, IssuedTicket>(concat!(
            "SELECT ",
            ticket_columns!(),
            " FROM issued_tickets WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<IssuedTicket>> {
        let ticket = sqlx::query_as::<_, IssuedTicket>(concat!(
            "SELECT ",
            ticket_columns!(),
            " FROM issued_tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn tickets_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<IssuedTicket>> {
        let tickets = sqlx::query_as::<_, IssuedTicket>(concat!(
            "SELECT ",
            ticket_columns!(),
            " FROM issued_tickets WHERE owner_id = $1 ORDER BY issued_at, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    async fn check_in(&self, record: CheckInRecord) -> StoreResult<Transition<CheckInRecord>> {
        let mut tx = self.pool.begin().await?;
        let used = sqlx::query(
            "UPDATE issued_tickets SET status = 'used', updated_at = $2 \
             WHERE id = $1 AND status = 'active'",
        )
        .bind(record.ticket_id)
        .bind(record.checked_in_at)
        .execute(&mut *tx)
        .await?;

        if used.rows_affected() == 0 {
            return Ok(match ticket_status(&mut tx, record.ticket_id).await? {
                Some(status) => Transition::Rejected(status),
                None => Transition::Missing,
            });
        }

        sqlx::query(concat!(
            "INSERT INTO check_ins (",
            check_in_columns!(),
            ") VALUES ($1, $2, $3, $4, $5)"
        ))
        .bind(record.id)
        .bind(record.ticket_id)
        .bind(record.staff_id)
        .bind(record.event_id)
        .bind(record.checked_in_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Transition::Applied(record))
    }

    async fn cancel(
        &self,
        ticket_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Transition<IssuedTicket>> {
        let mut conn = self.pool.acquire().await?;
        let cancelled = sqlx::query_as::<_, IssuedTicket>(concat!(
            "UPDATE issued_tickets SET status = 'cancelled', updated_at = $2 \
             WHERE id = $1 AND status = 'active' RETURNING ",
            ticket_columns!()
        ))
        .bind(ticket_id)
        .bind(at)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(ticket) = cancelled {
            return Ok(Transition::Applied(ticket));
        }
        Ok(match ticket_status(&mut conn, ticket_id).await? {
            Some(status) => Transition::Rejected(status),
            None => Transition::Missing,
        })
    }

    async fn check_in_for_ticket(&self, ticket_id: Uuid) -> StoreResult<Option<CheckInRecord>> {
        let record = sqlx::query_as::<_, CheckInRecord>(concat!(
            "SELECT ",
            check_in_columns!(),
            " FROM check_ins WHERE ticket_id = $1"
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn check_ins_for_event(&self, event_id: Uuid) -> StoreResult<Vec<CheckInRecord>> {
        let records = sqlx::query_as::<_, CheckInRecord>(concat!(
            "SELECT ",
            check_in_columns!(),
            " FROM check_ins WHERE event_id = $1 ORDER BY checked_in_at, id"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn summary_for_event(&self, event_id: Uuid) -> StoreResult<CheckInSummary> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM issued_tickets WHERE event_id = $1 GROUP BY status",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summary = CheckInSummary::default();
        for (status, count) in rows {
            let count = u64::try_from(count).map_err(|e| StoreError::Unexpected(e.into()))?;
            summary.issued += count;
            match parse_status(&status)? {
                TicketStatus::Active => summary.active += count,
                TicketStatus::Used => summary.checked_in += count,
                TicketStatus::Cancelled => summary.cancelled += count,
            }
        }
        Ok(summary)
    }
}

#[async_trait]
impl StaffStore for PgStore {
    async fn create_staff(
        &self,
        staff: StaffMember,
        credential: StaffCredential,
    ) -> StoreResult<StaffMember> {
        let insert = sqlx::query(concat!(
            "INSERT INTO staff_members (",
            staff_columns!(),
            ", password_hash) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(staff.id)
        .bind(staff.event_id)
        .bind(&staff.name)
        .bind(&staff.email)
        .bind(&staff.phone)
        .bind(staff.role.as_str())
        .bind(staff.is_active)
        .bind(staff.created_at)
        .bind(staff.last_login)
        .bind(&credential.password_hash)
        .execute(&self.pool)
        .await;
        match insert {
            Ok(_) => Ok(staff),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(format!(
                "{} is already registered for this event",
                staff.email
            ))),
            Err(err) if is_foreign_key_violation(&err) => {
                Err(StoreError::NotFound(format!("event {}", staff.event_id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_staff(&self, id: Uuid) -> StoreResult<Option<StaffMember>> {
        let staff = sqlx::query_as::<_, StaffMember>(concat!(
            "SELECT ",
            staff_columns!(),
            " FROM staff_members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn find_staff_login(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<(StaffMember, StaffCredential)>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            staff_columns!(),
            ", password_hash FROM staff_members WHERE event_id = $1 AND email = $2"
        ))
        .bind(event_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some((
                StaffMember::from_row(&row)?,
                StaffCredential::from_row(&row)?,
            ))),
            None => Ok(None),
        }
    }

    async fn list_staff(&self, event_id: Uuid) -> StoreResult<Vec<StaffMember>> {
        let staff = sqlx::query_as::<_, StaffMember>(concat!(
            "SELECT ",
            staff_columns!(),
            " FROM staff_members WHERE event_id = $1 ORDER BY created_at, name"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn update_staff(&self, id: Uuid, patch: StaffPatch) -> StoreResult<Option<StaffMember>> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, StaffMember>(concat!(
            "SELECT ",
            staff_columns!(),
            " FROM staff_members WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut staff) = current else {
            return Ok(None);
        };
        patch.apply(&mut staff);

        let update = sqlx::query(
            "UPDATE staff_members SET name = $2, email = $3, phone = $4, role = $5, is_active = $6 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&staff.name)
        .bind(&staff.email)
        .bind(&staff.phone)
        .bind(staff.role.as_str())
        .bind(staff.is_active)
        .execute(&mut *tx)
        .await;
        match update {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict(format!(
                    "{} is already registered for this event",
                    staff.email
                )))
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await?;
        Ok(Some(staff))
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let updated = sqlx::query("UPDATE staff_members SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("staff member {}", id)));
        }
        Ok(())
    }
}

impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
