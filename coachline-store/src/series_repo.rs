use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use coachline_core::repository::{SeriesRepository, StoreError, StoreResult};
use coachline_core::{RecurringSeries, SeriesStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::map_sqlx;

const SERIES_COLUMNS: &str = "id, parent_id, trainer_id, player_id, package_id, day_of_week, \
     start_time, duration_minutes, cadence, total_sessions, sessions_remaining, sessions_completed, \
     hourly_rate_cents, status, start_date, next_session_date, payment_type, location, created_at, \
     updated_at";

#[derive(sqlx::FromRow)]
struct SeriesRow {
    id: Uuid,
    parent_id: Uuid,
    trainer_id: Uuid,
    player_id: Option<Uuid>,
    package_id: Option<Uuid>,
    day_of_week: i16,
    start_time: NaiveTime,
    duration_minutes: i32,
    cadence: String,
    total_sessions: Option<i32>,
    sessions_remaining: Option<i32>,
    sessions_completed: i32,
    hourly_rate_cents: i64,
    status: String,
    start_date: NaiveDate,
    next_session_date: NaiveDate,
    payment_type: String,
    location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SeriesRow> for RecurringSeries {
    type Error = StoreError;

    fn try_from(row: SeriesRow) -> Result<Self, Self::Error> {
        let corrupt = |e: coachline_core::CoreError| StoreError::Fatal(format!("series {}: {}", row.id, e));
        Ok(RecurringSeries {
            id: row.id,
            parent_id: row.parent_id,
            trainer_id: row.trainer_id,
            player_id: row.player_id,
            package_id: row.package_id,
            day_of_week: u8::try_from(row.day_of_week)
                .map_err(|_| StoreError::Fatal(format!("series {}: bad day_of_week", row.id)))?,
            start_time: row.start_time,
            duration_minutes: row.duration_minutes,
            cadence: row.cadence.parse().map_err(corrupt)?,
            total_sessions: row.total_sessions,
            sessions_remaining: row.sessions_remaining,
            sessions_completed: row.sessions_completed,
            hourly_rate_cents: row.hourly_rate_cents,
            status: row.status.parse().map_err(corrupt)?,
            start_date: row.start_date,
            next_session_date: row.next_session_date,
            payment_type: row.payment_type.parse().map_err(corrupt)?,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgSeriesRepository {
    pool: PgPool,
}

impl PgSeriesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SeriesRepository for PgSeriesRepository {
    async fn create_series(&self, series: &RecurringSeries) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO recurring_series ({}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
            SERIES_COLUMNS
        ))
        .bind(series.id)
        .bind(series.parent_id)
        .bind(series.trainer_id)
        .bind(series.player_id)
        .bind(series.package_id)
        .bind(series.day_of_week as i16)
        .bind(series.start_time)
        .bind(series.duration_minutes)
        .bind(series.cadence.as_str())
        .bind(series.total_sessions)
        .bind(series.sessions_remaining)
        .bind(series.sessions_completed)
        .bind(series.hourly_rate_cents)
        .bind(series.status.as_str())
        .bind(series.start_date)
        .bind(series.next_session_date)
        .bind(series.payment_type.as_str())
        .bind(&series.location)
        .bind(series.created_at)
        .bind(series.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn get_series(&self, id: Uuid) -> StoreResult<Option<RecurringSeries>> {
        let row: Option<SeriesRow> = sqlx::query_as(&format!(
            "SELECT {} FROM recurring_series WHERE id = $1",
            SERIES_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(RecurringSeries::try_from).transpose()
    }

    async fn advance_cursor(&self, id: Uuid, next_session_date: NaiveDate) -> StoreResult<()> {
        sqlx::query("UPDATE recurring_series SET next_session_date = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(next_session_date)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn set_series_status(&self, id: Uuid, status: SeriesStatus) -> StoreResult<()> {
        sqlx::query("UPDATE recurring_series SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn record_series_completion(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<RecurringSeries>> {
        // Right-hand sides see the pre-update row.
        let row: Option<SeriesRow> = sqlx::query_as(&format!(
            r#"
            UPDATE recurring_series SET
                sessions_completed = sessions_completed + 1,
                sessions_remaining = CASE
                    WHEN sessions_remaining IS NULL THEN NULL
                    ELSE GREATEST(sessions_remaining - 1, 0)
                END,
                status = CASE
                    WHEN sessions_remaining IS NOT NULL AND sessions_remaining <= 1 AND status = 'active'
                        THEN 'completed'
                    ELSE status
                END,
                updated_at = $2
            WHERE id = $1
            RETURNING {}
            "#,
            SERIES_COLUMNS
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(RecurringSeries::try_from).transpose()
    }

    async fn list_active_series_ids(&self) -> StoreResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT id FROM recurring_series WHERE status = 'active' ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)
    }
}
