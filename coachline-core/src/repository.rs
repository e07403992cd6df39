use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, ParentStats, Party, RecurringSeries, Review, SeriesStatus, Slot,
    TrainerProfile, TrainerScore, TrainerStats,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Worth exactly one retry (pool timeout, serialization failure, booking-number clash).
    #[error("Transient storage failure: {0}")]
    Transient(String),

    #[error("Slot already occupied")]
    SlotTaken,

    #[error("Storage failure: {0}")]
    Fatal(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A transaction scoped to one slot. While it is open no other transaction
/// can observe the slot as free.
#[async_trait]
pub trait SlotTransaction: Send {
    async fn is_busy(&mut self) -> StoreResult<bool>;

    async fn insert(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Repository trait for booking data access
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Open a transaction holding the write lock for `slot`.
    async fn begin_slot(&self, slot: &Slot) -> StoreResult<Box<dyn SlotTransaction>>;

    /// Lock-free read, only suitable for previews.
    async fn is_busy(&self, slot: &Slot) -> StoreResult<bool>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn find_series_booking(
        &self,
        series_id: Uuid,
        session_date: NaiveDate,
    ) -> StoreResult<Option<Booking>>;

    /// Materialized bookings of a series that are not cancelled. No-shows
    /// still spend the budget.
    async fn count_active_series_bookings(&self, series_id: Uuid) -> StoreResult<i64>;

    /// Set a confirmation flag. Returns false when it was already set.
    async fn mark_confirmed(&self, id: Uuid, party: Party, at: DateTime<Utc>) -> StoreResult<bool>;

    /// Compare-and-set on status. Returns false when the stored status was no longer `from`.
    async fn transition_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Cancel member bookings dated strictly after `after` that are not in a terminal status.
    async fn cancel_series_bookings_after(
        &self,
        series_id: Uuid,
        after: NaiveDate,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    async fn list_trainer_bookings(&self, trainer_id: Uuid) -> StoreResult<Vec<Booking>>;

    /// Recompute session counters and money totals for both parties from completed bookings.
    async fn refresh_party_stats(&self, trainer_id: Uuid, parent_id: Option<Uuid>) -> StoreResult<()>;
}

/// Repository trait for recurring series
#[async_trait]
pub trait SeriesRepository: Send + Sync {
    async fn create_series(&self, series: &RecurringSeries) -> StoreResult<()>;

    async fn get_series(&self, id: Uuid) -> StoreResult<Option<RecurringSeries>>;

    async fn advance_cursor(&self, id: Uuid, next_session_date: NaiveDate) -> StoreResult<()>;

    async fn set_series_status(&self, id: Uuid, status: SeriesStatus) -> StoreResult<()>;

    /// Atomically count one completed session and close the series when the budget hits zero.
    async fn record_series_completion(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<RecurringSeries>>;

    async fn list_active_series_ids(&self) -> StoreResult<Vec<Uuid>>;
}

/// Repository trait for trainer profile fields owned by this core
#[async_trait]
pub trait TrainerRepository: Send + Sync {
    async fn get_trainer(&self, id: Uuid) -> StoreResult<Option<TrainerProfile>>;

    async fn get_score(&self, id: Uuid) -> StoreResult<Option<TrainerScore>>;

    /// Persist sub-scores and composite. Never touches the elite flag.
    async fn save_score(&self, id: Uuid, score: &TrainerScore) -> StoreResult<()>;

    /// Grant elite tier. Returns true only on the first grant.
    async fn grant_elite(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool>;

    async fn list_active_trainer_ids(&self) -> StoreResult<Vec<Uuid>>;

    async fn get_trainer_stats(&self, id: Uuid) -> StoreResult<Option<TrainerStats>>;

    async fn get_parent_stats(&self, id: Uuid) -> StoreResult<Option<ParentStats>>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn add_review(&self, review: &Review) -> StoreResult<()>;

    async fn average_rating(&self, trainer_id: Uuid) -> StoreResult<Option<f64>>;
}
