use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, ParentStats, Party, RecurringSeries, Review, SeriesStatus, Slot,
    TrainerProfile, TrainerScore, TrainerStats,
};
use crate::repository::{
    BookingStore, ReviewRepository, SeriesRepository, SlotTransaction, StoreError, StoreResult,
    TrainerRepository,
};

struct TrainerRecord {
    profile: TrainerProfile,
    score: TrainerScore,
    stats: TrainerStats,
}

#[derive(Default)]
struct MemoryState {
    bookings: HashMap<Uuid, Booking>,
    series: HashMap<Uuid, RecurringSeries>,
    trainers: HashMap<Uuid, TrainerRecord>,
    parents: HashMap<Uuid, ParentStats>,
    reviews: Vec<Review>,
    failing_inserts: u32,
}

impl MemoryState {
    fn slot_busy(&self, slot: &Slot) -> bool {
        self.bookings
            .values()
            .any(|b| b.slot() == *slot && b.status.occupies_slot())
    }
}

/// Single-process store behind one async mutex.
///
/// Every slot transaction holds the mutex until commit or rollback, which
/// serializes check-then-insert the same way the row lock does in Postgres.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_trainer(&self, profile: TrainerProfile) {
        let mut state = self.state.lock().await;
        state.trainers.insert(
            profile.id,
            TrainerRecord {
                profile,
                score: TrainerScore::default(),
                stats: TrainerStats::default(),
            },
        );
    }

    /// Seed a booking without slot checks (history fixtures, imports).
    pub async fn seed_booking(&self, booking: Booking) {
        self.state.lock().await.bookings.insert(booking.id, booking);
    }

    /// Make the next `n` inserts fail with a transient error.
    pub async fn fail_next_inserts(&self, n: u32) {
        self.state.lock().await.failing_inserts = n;
    }

    pub async fn all_bookings(&self) -> Vec<Booking> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state.bookings.values().cloned().collect();
        bookings.sort_by_key(|b| (b.session_date, b.start_time));
        bookings
    }
}

pub struct MemorySlotTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    slot: Slot,
    staged: Vec<Booking>,
}

#[async_trait]
impl SlotTransaction for MemorySlotTransaction {
    async fn is_busy(&mut self) -> StoreResult<bool> {
        let slot = self.slot;
        Ok(self.guard.slot_busy(&slot) || self.staged.iter().any(|b| b.slot() == slot))
    }

    async fn insert(&mut self, booking: &Booking) -> StoreResult<()> {
        if self.guard.failing_inserts > 0 {
            self.guard.failing_inserts -= 1;
            return Err(StoreError::Transient("injected insert failure".to_string()));
        }

        if self
            .guard
            .bookings
            .values()
            .any(|b| b.booking_number == booking.booking_number)
        {
            return Err(StoreError::Transient(format!(
                "duplicate booking number {}",
                booking.booking_number
            )));
        }

        if booking.status.occupies_slot() && self.guard.slot_busy(&booking.slot()) {
            return Err(StoreError::SlotTaken);
        }

        self.staged.push(booking.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemorySlotTransaction {
            mut guard, staged, ..
        } = *self;
        for booking in staged {
            guard.bookings.insert(booking.id, booking);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn begin_slot(&self, slot: &Slot) -> StoreResult<Box<dyn SlotTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemorySlotTransaction {
            guard,
            slot: *slot,
            staged: Vec::new(),
        }))
    }

    async fn is_busy(&self, slot: &Slot) -> StoreResult<bool> {
        Ok(self.state.lock().await.slot_busy(slot))
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn find_series_booking(
        &self,
        series_id: Uuid,
        session_date: NaiveDate,
    ) -> StoreResult<Option<Booking>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .values()
            .find(|b| b.recurring_id == Some(series_id) && b.session_date == session_date)
            .cloned())
    }

    async fn count_active_series_bookings(&self, series_id: Uuid) -> StoreResult<i64> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.recurring_id == Some(series_id) && b.status != BookingStatus::Cancelled)
            .count() as i64)
    }

    async fn mark_confirmed(&self, id: Uuid, party: Party, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| StoreError::Fatal(format!("booking {} vanished", id)))?;
        Ok(booking.confirm(party, at))
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.bookings.get_mut(&id) {
            Some(booking) if booking.status == from => {
                booking.apply_status(to, actor, at);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::Fatal(format!("booking {} vanished", id))),
        }
    }

    async fn cancel_series_bookings_after(
        &self,
        series_id: Uuid,
        after: NaiveDate,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let mut cancelled = 0;
        for booking in state.bookings.values_mut() {
            if booking.recurring_id == Some(series_id)
                && booking.session_date > after
                && !booking.status.is_terminal()
            {
                booking.apply_status(BookingStatus::Cancelled, actor, at);
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn list_trainer_bookings(&self, trainer_id: Uuid) -> StoreResult<Vec<Booking>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.trainer_id == trainer_id)
            .cloned()
            .collect())
    }

    async fn refresh_party_stats(&self, trainer_id: Uuid, parent_id: Option<Uuid>) -> StoreResult<()> {
        let mut state = self.state.lock().await;

        let completed: Vec<(Uuid, Option<Uuid>, i64, i64)> = state
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Completed)
            .map(|b| (b.trainer_id, b.parent_id, b.trainer_payout_cents, b.total_amount_cents))
            .collect();

        let trainer_stats = completed
            .iter()
            .filter(|(t, ..)| *t == trainer_id)
            .fold(TrainerStats::default(), |mut acc, (_, _, payout, _)| {
                acc.completed_sessions += 1;
                acc.total_earnings_cents += payout;
                acc
            });
        if let Some(record) = state.trainers.get_mut(&trainer_id) {
            record.stats = trainer_stats;
        }

        if let Some(parent_id) = parent_id {
            let parent_stats = completed
                .iter()
                .filter(|(_, p, ..)| *p == Some(parent_id))
                .fold(ParentStats::default(), |mut acc, (_, _, _, total)| {
                    acc.completed_sessions += 1;
                    acc.total_spent_cents += total;
                    acc
                });
            state.parents.insert(parent_id, parent_stats);
        }

        Ok(())
    }
}

#[async_trait]
impl SeriesRepository for InMemoryStore {
    async fn create_series(&self, series: &RecurringSeries) -> StoreResult<()> {
        self.state
            .lock()
            .await
            .series
            .insert(series.id, series.clone());
        Ok(())
    }

    async fn get_series(&self, id: Uuid) -> StoreResult<Option<RecurringSeries>> {
        Ok(self.state.lock().await.series.get(&id).cloned())
    }

    async fn advance_cursor(&self, id: Uuid, next_session_date: NaiveDate) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if let Some(series) = state.series.get_mut(&id) {
            series.next_session_date = next_session_date;
            series.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_series_status(&self, id: Uuid, status: SeriesStatus) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if let Some(series) = state.series.get_mut(&id) {
            series.status = status;
            series.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record_series_completion(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<RecurringSeries>> {
        let mut state = self.state.lock().await;
        Ok(state.series.get_mut(&id).map(|series| {
            series.record_completion(at);
            series.clone()
        }))
    }

    async fn list_active_series_ids(&self) -> StoreResult<Vec<Uuid>> {
        let state = self.state.lock().await;
        Ok(state
            .series
            .values()
            .filter(|s| s.status == SeriesStatus::Active)
            .map(|s| s.id)
            .collect())
    }
}

#[async_trait]
impl TrainerRepository for InMemoryStore {
    async fn get_trainer(&self, id: Uuid) -> StoreResult<Option<TrainerProfile>> {
        Ok(self
            .state
            .lock()
            .await
            .trainers
            .get(&id)
            .map(|r| r.profile.clone()))
    }

    async fn get_score(&self, id: Uuid) -> StoreResult<Option<TrainerScore>> {
        Ok(self
            .state
            .lock()
            .await
            .trainers
            .get(&id)
            .map(|r| r.score.clone()))
    }

    async fn save_score(&self, id: Uuid, score: &TrainerScore) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let record = state
            .trainers
            .get_mut(&id)
            .ok_or_else(|| StoreError::Fatal(format!("trainer {} not found", id)))?;
        record.score = TrainerScore {
            is_elite: record.score.is_elite,
            elite_awarded_at: record.score.elite_awarded_at,
            ..score.clone()
        };
        Ok(())
    }

    async fn grant_elite(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.trainers.get_mut(&id) {
            Some(record) if !record.score.is_elite => {
                record.score.is_elite = true;
                record.score.elite_awarded_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_active_trainer_ids(&self) -> StoreResult<Vec<Uuid>> {
        let state = self.state.lock().await;
        Ok(state
            .trainers
            .values()
            .filter(|r| r.profile.is_active)
            .map(|r| r.profile.id)
            .collect())
    }

    async fn get_trainer_stats(&self, id: Uuid) -> StoreResult<Option<TrainerStats>> {
        Ok(self
            .state
            .lock()
            .await
            .trainers
            .get(&id)
            .map(|r| r.stats.clone()))
    }

    async fn get_parent_stats(&self, id: Uuid) -> StoreResult<Option<ParentStats>> {
        Ok(self.state.lock().await.parents.get(&id).cloned())
    }
}

#[async_trait]
impl ReviewRepository for InMemoryStore {
    async fn add_review(&self, review: &Review) -> StoreResult<()> {
        self.state.lock().await.reviews.push(review.clone());
        Ok(())
    }

    async fn average_rating(&self, trainer_id: Uuid) -> StoreResult<Option<f64>> {
        let state = self.state.lock().await;
        let ratings: Vec<f64> = state
            .reviews
            .iter()
            .filter(|r| r.trainer_id == trainer_id)
            .map(|r| r.rating as f64)
            .collect();
        if ratings.is_empty() {
            return Ok(None);
        }
        Ok(Some(ratings.iter().sum::<f64>() / ratings.len() as f64))
    }
}
