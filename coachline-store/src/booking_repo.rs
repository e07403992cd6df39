use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use coachline_core::repository::{BookingStore, SlotTransaction, StoreError, StoreResult};
use coachline_core::{Booking, BookingStatus, Party, Slot};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::map_sqlx;

const BOOKING_COLUMNS: &str = "id, booking_number, trainer_id, parent_id, player_id, session_date, \
     start_time, end_time, duration_minutes, location, notes, hourly_rate_cents, total_amount_cents, \
     platform_fee_cents, trainer_payout_cents, platform_fee_percent, status, payment_status, \
     parent_confirmed, parent_confirmed_at, trainer_confirmed, trainer_confirmed_at, recurring_id, \
     is_recurring, cancelled_by, cancelled_at, created_at, updated_at";

// Internal row struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_number: String,
    trainer_id: Uuid,
    parent_id: Option<Uuid>,
    player_id: Option<Uuid>,
    session_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    duration_minutes: i32,
    location: Option<String>,
    notes: Option<String>,
    hourly_rate_cents: i64,
    total_amount_cents: i64,
    platform_fee_cents: i64,
    trainer_payout_cents: i64,
    platform_fee_percent: f64,
    status: String,
    payment_status: String,
    parent_confirmed: bool,
    parent_confirmed_at: Option<DateTime<Utc>>,
    trainer_confirmed: bool,
    trainer_confirmed_at: Option<DateTime<Utc>>,
    recurring_id: Option<Uuid>,
    is_recurring: bool,
    cancelled_by: Option<Uuid>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            booking_number: row.booking_number,
            trainer_id: row.trainer_id,
            parent_id: row.parent_id,
            player_id: row.player_id,
            session_date: row.session_date,
            start_time: row.start_time,
            end_time: row.end_time,
            duration_minutes: row.duration_minutes,
            location: row.location,
            notes: row.notes,
            hourly_rate_cents: row.hourly_rate_cents,
            total_amount_cents: row.total_amount_cents,
            platform_fee_cents: row.platform_fee_cents,
            trainer_payout_cents: row.trainer_payout_cents,
            platform_fee_percent: row.platform_fee_percent,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Fatal(format!("booking {}: {}", row.id, e)))?,
            payment_status: row
                .payment_status
                .parse()
                .map_err(|e| StoreError::Fatal(format!("booking {}: {}", row.id, e)))?,
            parent_confirmed: row.parent_confirmed,
            parent_confirmed_at: row.parent_confirmed_at,
            trainer_confirmed: row.trainer_confirmed,
            trainer_confirmed_at: row.trainer_confirmed_at,
            recurring_id: row.recurring_id,
            is_recurring: row.is_recurring,
            cancelled_by: row.cancelled_by,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> StoreResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Slot-scoped transaction. The advisory lock taken in `begin_slot` is held
/// until commit or rollback, so concurrent creators of the same slot queue up
/// behind it.
pub struct PgSlotTransaction {
    tx: Transaction<'static, Postgres>,
    slot: Slot,
}

#[async_trait]
impl SlotTransaction for PgSlotTransaction {
    async fn is_busy(&mut self) -> StoreResult<bool> {
        let existing: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM bookings
            WHERE trainer_id = $1 AND session_date = $2 AND start_time = $3
              AND status NOT IN ('cancelled', 'no_show')
            FOR UPDATE
            "#,
        )
        .bind(self.slot.trainer_id)
        .bind(self.slot.session_date)
        .bind(self.slot.start_time)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(existing.is_some())
    }

    async fn insert(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO bookings ({}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
              $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)",
            BOOKING_COLUMNS
        ))
        .bind(booking.id)
        .bind(&booking.booking_number)
        .bind(booking.trainer_id)
        .bind(booking.parent_id)
        .bind(booking.player_id)
        .bind(booking.session_date)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.duration_minutes)
        .bind(&booking.location)
        .bind(&booking.notes)
        .bind(booking.hourly_rate_cents)
        .bind(booking.total_amount_cents)
        .bind(booking.platform_fee_cents)
        .bind(booking.trainer_payout_cents)
        .bind(booking.platform_fee_percent)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.parent_confirmed)
        .bind(booking.parent_confirmed_at)
        .bind(booking.trainer_confirmed)
        .bind(booking.trainer_confirmed_at)
        .bind(booking.recurring_id)
        .bind(booking.is_recurring)
        .bind(booking.cancelled_by)
        .bind(booking.cancelled_at)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(map_sqlx)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(map_sqlx)
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn begin_slot(&self, slot: &Slot) -> StoreResult<Box<dyn SlotTransaction>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        // Serializes creators of this slot even when no row exists yet.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(slot.lock_key())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        Ok(Box::new(PgSlotTransaction { tx, slot: *slot }))
    }

    async fn is_busy(&self, slot: &Slot) -> StoreResult<bool> {
        let busy: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE trainer_id = $1 AND session_date = $2 AND start_time = $3
                  AND status NOT IN ('cancelled', 'no_show')
            )
            "#,
        )
        .bind(slot.trainer_id)
        .bind(slot.session_date)
        .bind(slot.start_time)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(busy)
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        row.map(Booking::try_from).transpose()
    }

    async fn find_series_booking(
        &self,
        series_id: Uuid,
        session_date: NaiveDate,
    ) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE recurring_id = $1 AND session_date = $2 LIMIT 1",
            BOOKING_COLUMNS
        ))
        .bind(series_id)
        .bind(session_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(Booking::try_from).transpose()
    }

    async fn count_active_series_bookings(&self, series_id: Uuid) -> StoreResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE recurring_id = $1 AND status <> 'cancelled'",
        )
        .bind(series_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn mark_confirmed(&self, id: Uuid, party: Party, at: DateTime<Utc>) -> StoreResult<bool> {
        let sql = match party {
            Party::Parent => {
                "UPDATE bookings SET parent_confirmed = TRUE, parent_confirmed_at = $2, updated_at = $2 \
                 WHERE id = $1 AND parent_confirmed = FALSE"
            }
            Party::Trainer => {
                "UPDATE bookings SET trainer_confirmed = TRUE, trainer_confirmed_at = $2, updated_at = $2 \
                 WHERE id = $1 AND trainer_confirmed = FALSE"
            }
        };

        let result = sqlx::query(sql)
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected() == 1)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                status = $3,
                cancelled_by = CASE WHEN $3 = 'cancelled' THEN $4::uuid ELSE cancelled_by END,
                cancelled_at = CASE WHEN $3 = 'cancelled' THEN $5::timestamptz ELSE cancelled_at END,
                updated_at = $5
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(actor)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.rows_affected() == 1)
    }

    async fn cancel_series_bookings_after(
        &self,
        series_id: Uuid,
        after: NaiveDate,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                status = 'cancelled', cancelled_by = $3, cancelled_at = $4, updated_at = $4
            WHERE recurring_id = $1 AND session_date > $2
              AND status NOT IN ('completed', 'cancelled', 'no_show')
            "#,
        )
        .bind(series_id)
        .bind(after)
        .bind(actor)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.rows_affected())
    }

    async fn list_trainer_bookings(&self, trainer_id: Uuid) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE trainer_id = $1 ORDER BY session_date, start_time",
            BOOKING_COLUMNS
        ))
        .bind(trainer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        into_bookings(rows)
    }

    async fn refresh_party_stats(&self, trainer_id: Uuid, parent_id: Option<Uuid>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query(
            r#"
            UPDATE trainers SET
                completed_sessions = s.sessions,
                total_earnings_cents = s.earnings
            FROM (
                SELECT COUNT(*) AS sessions, COALESCE(SUM(trainer_payout_cents), 0)::BIGINT AS earnings
                FROM bookings WHERE trainer_id = $1 AND status = 'completed'
            ) s
            WHERE trainers.id = $1
            "#,
        )
        .bind(trainer_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if let Some(parent_id) = parent_id {
            sqlx::query(
                r#"
                INSERT INTO parent_stats (parent_id, completed_sessions, total_spent_cents)
                SELECT $1, COUNT(*), COALESCE(SUM(total_amount_cents), 0)::BIGINT
                FROM bookings WHERE parent_id = $1 AND status = 'completed'
                ON CONFLICT (parent_id) DO UPDATE SET
                    completed_sessions = EXCLUDED.completed_sessions,
                    total_spent_cents = EXCLUDED.total_spent_cents
                "#,
            )
            .bind(parent_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }

        tx.commit().await.map_err(map_sqlx)
    }
}
