use chrono::{Duration, NaiveDate, NaiveTime};
use coachline_core::models::weekday_index;
use coachline_core::repository::SeriesRepository;
use coachline_core::{
    BookingStatus, Cadence, CoreError, CoreResult, PaymentType, RecurringSeries, SeriesStatus,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::finance::{session_end, DEFAULT_DURATION_MINUTES};
use crate::lifecycle::BookingLifecycle;

/// Upper bound on how many dates a preview may ask for.
pub const MAX_PREVIEW_OCCURRENCES: u32 = 52;

fn default_duration() -> i32 {
    DEFAULT_DURATION_MINUTES
}

/// The repeating part of a series: who, which weekday, what time, how often.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPattern {
    pub trainer_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default)]
    pub cadence: Cadence,
    pub start_date: NaiveDate,
}

impl SeriesPattern {
    pub fn validate(&self) -> CoreResult<()> {
        if self.day_of_week > 6 {
            return Err(CoreError::Validation(format!(
                "day_of_week must be 0-6, got {}",
                self.day_of_week
            )));
        }
        session_end(self.start_time, self.duration_minutes)?;
        Ok(())
    }

    /// First date on or after `start_date` falling on `day_of_week` that is
    /// strictly after `today`.
    pub fn first_occurrence(&self, today: NaiveDate) -> NaiveDate {
        next_aligned(self.start_date, self.day_of_week, self.cadence.step(), today)
    }

    /// `count` consecutive occurrences starting at the first one.
    pub fn occurrences(&self, today: NaiveDate, count: u32) -> Vec<NaiveDate> {
        let mut date = self.first_occurrence(today);
        let mut dates = Vec::with_capacity(count as usize);
        for _ in 0..count {
            dates.push(date);
            date += self.cadence.step();
        }
        dates
    }
}

fn next_aligned(start_date: NaiveDate, day_of_week: u8, step: Duration, today: NaiveDate) -> NaiveDate {
    let offset = (day_of_week as i64 - weekday_index(start_date) as i64).rem_euclid(7);
    let mut date = start_date + Duration::days(offset);
    while date <= today {
        date += step;
    }
    date
}

fn default_payment_type() -> PaymentType {
    PaymentType::Upfront
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSeriesRequest {
    pub parent_id: Uuid,
    #[serde(flatten)]
    pub pattern: SeriesPattern,
    pub player_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    /// None means the series runs until cancelled.
    pub total_sessions: Option<i32>,
    #[serde(default = "default_payment_type")]
    pub payment_type: PaymentType,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewRequest {
    #[serde(flatten)]
    pub pattern: SeriesPattern,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictPreview {
    pub dates: Vec<NaiveDate>,
    pub conflicts: Vec<NaiveDate>,
}

/// Outcome of one generation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub created: u32,
    pub skipped_existing: u32,
    pub skipped_conflicts: u32,
    pub conflict_dates: Vec<NaiveDate>,
    pub next_session_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesCreation {
    pub series: RecurringSeries,
    pub generation: GenerationReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelReport {
    pub series_id: Uuid,
    pub cancelled_bookings: u64,
}

/// Expands standing commitments into dated bookings.
///
/// Every occurrence goes through `BookingLifecycle::create_occurrence`, so
/// series bookings get the same slot check and fee split as one-off ones.
pub struct RecurringEngine {
    lifecycle: Arc<BookingLifecycle>,
    series: Arc<dyn SeriesRepository>,
    default_window: u32,
}

impl RecurringEngine {
    pub fn new(
        lifecycle: Arc<BookingLifecycle>,
        series: Arc<dyn SeriesRepository>,
        default_window: u32,
    ) -> Self {
        Self {
            lifecycle,
            series,
            default_window,
        }
    }

    pub fn default_window(&self) -> u32 {
        self.default_window
    }

    pub async fn get(&self, series_id: Uuid) -> CoreResult<RecurringSeries> {
        self.series
            .get_series(series_id)
            .await?
            .ok_or_else(|| CoreError::series_not_found(series_id))
    }

    pub async fn create_series(&self, req: CreateSeriesRequest) -> CoreResult<SeriesCreation> {
        req.pattern.validate()?;
        if let Some(total) = req.total_sessions {
            if total <= 0 {
                return Err(CoreError::Validation(
                    "total_sessions must be positive".to_string(),
                ));
            }
        }

        let hourly_rate_cents = self.lifecycle.resolve_rate(req.pattern.trainer_id).await?;
        let now = self.lifecycle.clock().now();
        let first = req.pattern.first_occurrence(self.lifecycle.clock().today());

        let series = RecurringSeries {
            id: Uuid::new_v4(),
            parent_id: req.parent_id,
            trainer_id: req.pattern.trainer_id,
            player_id: req.player_id,
            package_id: req.package_id,
            day_of_week: req.pattern.day_of_week,
            start_time: req.pattern.start_time,
            duration_minutes: req.pattern.duration_minutes,
            cadence: req.pattern.cadence,
            total_sessions: req.total_sessions,
            sessions_remaining: req.total_sessions,
            sessions_completed: 0,
            hourly_rate_cents,
            status: SeriesStatus::Active,
            start_date: req.pattern.start_date,
            next_session_date: first,
            payment_type: req.payment_type,
            location: req.location,
            created_at: now,
            updated_at: now,
        };

        self.series.create_series(&series).await?;
        info!(
            "Series {} created for trainer {} every {} from {}",
            series.id,
            series.trainer_id,
            series.cadence.as_str(),
            first
        );

        let generation = self.generate_upcoming(series.id, self.default_window).await?;
        let series = self.get(series.id).await?;

        Ok(SeriesCreation { series, generation })
    }

    /// Materialize up to `window` occurrences from the series cursor.
    ///
    /// Nothing is generated past the `window`-th upcoming occurrence, so
    /// repeated passes on the same day leave the cursor where it is.
    /// Re-running over dates that already have a booking creates nothing and
    /// still moves the cursor past them.
    pub async fn generate_upcoming(&self, series_id: Uuid, window: u32) -> CoreResult<GenerationReport> {
        let series = self.get(series_id).await?;
        let mut report = GenerationReport {
            next_session_date: Some(series.next_session_date),
            ..Default::default()
        };

        if series.status != SeriesStatus::Active {
            debug!("Series {} is {}, skipping generation", series_id, series.status.as_str());
            return Ok(report);
        }
        let iterations = match series.sessions_remaining {
            Some(remaining) if remaining <= 0 => return Ok(report),
            Some(remaining) => window.min(remaining as u32),
            None => window,
        };

        let store = self.lifecycle.store();
        let step = series.cadence.step();
        let today = self.lifecycle.clock().today();

        // A cursor left behind by a stalled worker never produces past bookings.
        let mut cursor = series.next_session_date;
        while cursor <= today {
            cursor += step;
        }
        let horizon = next_aligned(series.start_date, series.day_of_week, step, today)
            + step * (window.saturating_sub(1) as i32);

        let mut active = store.count_active_series_bookings(series_id).await?;

        for _ in 0..iterations {
            if cursor > horizon {
                break;
            }
            if store.find_series_booking(series_id, cursor).await?.is_some() {
                report.skipped_existing += 1;
            } else {
                if let Some(total) = series.total_sessions {
                    if active >= total as i64 {
                        break;
                    }
                }

                match self.lifecycle.create_occurrence(&series, cursor).await {
                    Ok(_) => {
                        report.created += 1;
                        active += 1;
                    }
                    Err(e) if e.is_conflict() => {
                        warn!("Series {} skipped {}: trainer already booked", series_id, cursor);
                        report.skipped_conflicts += 1;
                        report.conflict_dates.push(cursor);
                    }
                    Err(e) => {
                        self.series.advance_cursor(series_id, cursor).await?;
                        return Err(e);
                    }
                }
            }
            cursor += step;
        }

        self.series.advance_cursor(series_id, cursor).await?;
        report.next_session_date = Some(cursor);

        info!(
            "Series {} generation: {} created, {} existing, {} conflicts, next {}",
            series_id, report.created, report.skipped_existing, report.skipped_conflicts, cursor
        );
        Ok(report)
    }

    /// Dates the pattern would produce and which of them are already taken. Writes nothing.
    pub async fn conflict_preview(&self, req: PreviewRequest) -> CoreResult<ConflictPreview> {
        req.pattern.validate()?;
        let count = req
            .count
            .unwrap_or(self.default_window)
            .min(MAX_PREVIEW_OCCURRENCES);

        let dates = req
            .pattern
            .occurrences(self.lifecycle.clock().today(), count);

        let mut conflicts = Vec::new();
        for date in &dates {
            if self
                .lifecycle
                .ledger()
                .is_busy(req.pattern.trainer_id, *date, req.pattern.start_time)
                .await?
            {
                conflicts.push(*date);
            }
        }

        Ok(ConflictPreview { dates, conflicts })
    }

    pub async fn pause(&self, series_id: Uuid, actor_id: Option<Uuid>) -> CoreResult<RecurringSeries> {
        let mut series = self.get(series_id).await?;
        check_party(&series, actor_id)?;

        if series.status != SeriesStatus::Active {
            return Err(CoreError::Validation(format!(
                "series {} is {} and cannot be paused",
                series_id,
                series.status.as_str()
            )));
        }

        self.series
            .set_series_status(series_id, SeriesStatus::Paused)
            .await?;
        series.status = SeriesStatus::Paused;
        info!("Series {} paused", series_id);
        Ok(series)
    }

    /// Stop the series. With `future_only` past bookings stay as they are;
    /// otherwise every open member booking is cancelled.
    pub async fn cancel(
        &self,
        series_id: Uuid,
        future_only: bool,
        actor_id: Option<Uuid>,
    ) -> CoreResult<CancelReport> {
        let series = self.get(series_id).await?;
        check_party(&series, actor_id)?;

        if series.status == SeriesStatus::Completed {
            return Err(CoreError::Validation(format!(
                "series {} already completed",
                series_id
            )));
        }

        self.series
            .set_series_status(series_id, SeriesStatus::Cancelled)
            .await?;

        // Occurrences never precede the start date.
        let after = if future_only {
            self.lifecycle.clock().today()
        } else {
            series.start_date - Duration::days(1)
        };
        let cancelled_bookings = self
            .lifecycle
            .store()
            .cancel_series_bookings_after(series_id, after, actor_id, self.lifecycle.clock().now())
            .await?;

        info!(
            "Series {} cancelled, {} bookings cancelled",
            series_id, cancelled_bookings
        );
        Ok(CancelReport {
            series_id,
            cancelled_bookings,
        })
    }

    /// Count a completed occurrence against its series.
    pub async fn process_completion(&self, booking_id: Uuid) -> CoreResult<Option<RecurringSeries>> {
        let booking = self.lifecycle.get(booking_id).await?;
        let series_id = match booking.recurring_id {
            Some(id) if booking.status == BookingStatus::Completed => id,
            _ => return Ok(None),
        };

        let series = self
            .series
            .record_series_completion(series_id, self.lifecycle.clock().now())
            .await?;

        if let Some(series) = &series {
            if series.status == SeriesStatus::Completed {
                info!(
                    "Series {} completed after {} sessions",
                    series.id, series.sessions_completed
                );
            }
        }
        Ok(series)
    }

    /// Keep every active series topped up to its rolling window.
    pub async fn top_up_active(&self, window: u32) -> CoreResult<u32> {
        let mut created = 0;
        for series_id in self.series.list_active_series_ids().await? {
            match self.generate_upcoming(series_id, window).await {
                Ok(report) => created += report.created,
                Err(e) => warn!("Top-up failed for series {}: {}", series_id, e),
            }
        }
        Ok(created)
    }
}

fn check_party(series: &RecurringSeries, actor_id: Option<Uuid>) -> CoreResult<()> {
    match actor_id {
        Some(actor_id) if actor_id != series.parent_id && actor_id != series.trainer_id => {
            Err(CoreError::InvalidSeries {
                series_id: series.id,
                actor_id,
            })
        }
        _ => Ok(()),
    }
}
