use chrono::{NaiveDate, NaiveTime};
use coachline_core::repository::{
    BookingStore, SlotTransaction, StoreError, StoreResult, TrainerRepository,
};
use coachline_core::settings::SettingsProvider;
use coachline_core::{
    Booking, BookingStatus, Clock, CoreError, CoreResult, Party, PaymentStatus, RecurringSeries,
    SignalBus, Slot,
};
use coachline_shared::Signal;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::finance::{session_end, FeeSplit, DEFAULT_DURATION_MINUTES};
use crate::ledger::SlotLedger;

const BOOKING_NUMBER_PREFIX: &str = "CL";
const BOOKING_NUMBER_LEN: usize = 8;

/// Inbound creation request from checkout, admin or the SMS bot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBookingRequest {
    pub trainer_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub player_id: Option<Uuid>,
    pub session_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub booking_id: Uuid,
    pub booking_number: String,
}

/// Everything needed to insert a booking except its identity.
struct BookingDraft {
    trainer_id: Uuid,
    parent_id: Option<Uuid>,
    player_id: Option<Uuid>,
    session_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    duration_minutes: i32,
    location: Option<String>,
    notes: Option<String>,
    split: FeeSplit,
    payment_status: PaymentStatus,
    recurring_id: Option<Uuid>,
}

impl BookingDraft {
    fn slot(&self) -> Slot {
        Slot::new(self.trainer_id, self.session_date, self.start_time)
    }

    fn materialize(&self, booking_number: String, clock: &dyn Clock) -> Booking {
        let now = clock.now();
        Booking {
            id: Uuid::new_v4(),
            booking_number,
            trainer_id: self.trainer_id,
            parent_id: self.parent_id,
            player_id: self.player_id,
            session_date: self.session_date,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            location: self.location.clone(),
            notes: self.notes.clone(),
            hourly_rate_cents: self.split.hourly_rate_cents,
            total_amount_cents: self.split.total_amount_cents,
            platform_fee_cents: self.split.platform_fee_cents,
            trainer_payout_cents: self.split.trainer_payout_cents,
            platform_fee_percent: self.split.fee_percent,
            status: BookingStatus::Confirmed,
            payment_status: self.payment_status,
            parent_confirmed: false,
            parent_confirmed_at: None,
            trainer_confirmed: false,
            trainer_confirmed_at: None,
            recurring_id: self.recurring_id,
            is_recurring: self.recurring_id.is_some(),
            cancelled_by: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Short human-facing reference, e.g. `CL7K2Q9XMA`.
pub fn generate_booking_number() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOOKING_NUMBER_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{}{}", BOOKING_NUMBER_PREFIX, token)
}

/// Creates, transitions and finalizes individual bookings.
///
/// This is the only writer of the bookings table apart from series
/// cancellation in the recurring engine.
pub struct BookingLifecycle {
    ledger: SlotLedger,
    store: Arc<dyn BookingStore>,
    trainers: Arc<dyn TrainerRepository>,
    settings: Arc<dyn SettingsProvider>,
    signals: SignalBus,
    clock: Arc<dyn Clock>,
}

impl BookingLifecycle {
    pub fn new(
        store: Arc<dyn BookingStore>,
        trainers: Arc<dyn TrainerRepository>,
        settings: Arc<dyn SettingsProvider>,
        signals: SignalBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger: SlotLedger::new(store.clone()),
            store,
            trainers,
            settings,
            signals,
            clock,
        }
    }

    pub fn ledger(&self) -> &SlotLedger {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub async fn get(&self, booking_id: Uuid) -> CoreResult<Booking> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::booking_not_found(booking_id))
    }

    /// Create a one-off booking. Payment has already been captured by checkout.
    pub async fn create(&self, req: CreateBookingRequest) -> CoreResult<BookingReceipt> {
        // 1. Required fields
        let trainer_id = req.trainer_id.ok_or(CoreError::MissingField("trainer_id"))?;
        let session_date = req.session_date.ok_or(CoreError::MissingField("session_date"))?;
        let start_time = req.start_time.ok_or(CoreError::MissingField("start_time"))?;
        let duration_minutes = req.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        let end_time = session_end(start_time, duration_minutes)?;

        // 2. Rate and fee, frozen into the record
        let hourly_rate_cents = self.resolve_rate(trainer_id).await?;
        let fee_percent = self.settings.platform_fee_percent().await?;
        let split = FeeSplit::compute(hourly_rate_cents, duration_minutes, fee_percent)?;

        let draft = BookingDraft {
            trainer_id,
            parent_id: req.parent_id,
            player_id: req.player_id,
            session_date,
            start_time,
            end_time,
            duration_minutes,
            location: req.location,
            notes: req.notes,
            split,
            payment_status: PaymentStatus::Paid,
            recurring_id: None,
        };

        // 3. Check-then-insert under the slot lock
        let booking = self.place(&draft).await?;
        info!(
            "Booking {} created for trainer {} on {} at {}",
            booking.booking_number, trainer_id, session_date, start_time
        );

        self.announce_created(&booking);

        Ok(BookingReceipt {
            booking_id: booking.id,
            booking_number: booking.booking_number,
        })
    }

    /// Materialize one occurrence of a recurring series through the same slot-checked path.
    pub async fn create_occurrence(
        &self,
        series: &RecurringSeries,
        session_date: NaiveDate,
    ) -> CoreResult<Booking> {
        let end_time = session_end(series.start_time, series.duration_minutes)?;
        let fee_percent = self.settings.platform_fee_percent().await?;
        let split = FeeSplit::compute(series.hourly_rate_cents, series.duration_minutes, fee_percent)?;

        let draft = BookingDraft {
            trainer_id: series.trainer_id,
            parent_id: Some(series.parent_id),
            player_id: series.player_id,
            session_date,
            start_time: series.start_time,
            end_time,
            duration_minutes: series.duration_minutes,
            location: series.location.clone(),
            notes: None,
            split,
            payment_status: series.payment_type.occurrence_payment_status(),
            recurring_id: Some(series.id),
        };

        let booking = self.place(&draft).await?;
        self.announce_created(&booking);
        Ok(booking)
    }

    /// Move a booking to `new_status`. Terminal statuses cannot be left.
    ///
    /// `completed` is not accepted here: a booking completes only once both
    /// parties have confirmed, see `evaluate_completion`.
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
        actor_id: Option<Uuid>,
    ) -> CoreResult<Booking> {
        if new_status == BookingStatus::Completed {
            return Err(CoreError::Validation(
                "bookings complete only when both parent and trainer confirm".to_string(),
            ));
        }

        let (booking, _) = self.apply_status(booking_id, new_status, actor_id).await?;
        Ok(booking)
    }

    /// Same as `update_status` for callers holding the raw status name.
    pub async fn update_status_str(
        &self,
        booking_id: Uuid,
        new_status: &str,
        actor_id: Option<Uuid>,
    ) -> CoreResult<Booking> {
        let status: BookingStatus = new_status.trim().to_ascii_lowercase().parse()?;
        self.update_status(booking_id, status, actor_id).await
    }

    pub async fn confirm_by_parent(&self, booking_id: Uuid, actor_id: Uuid) -> CoreResult<Booking> {
        self.confirm(booking_id, actor_id, Party::Parent).await
    }

    pub async fn confirm_by_trainer(&self, booking_id: Uuid, actor_id: Uuid) -> CoreResult<Booking> {
        self.confirm(booking_id, actor_id, Party::Trainer).await
    }

    async fn confirm(&self, booking_id: Uuid, actor_id: Uuid, party: Party) -> CoreResult<Booking> {
        let booking = self.get(booking_id).await?;

        let owner = match party {
            Party::Parent => booking.parent_id,
            Party::Trainer => Some(booking.trainer_id),
        };
        if owner != Some(actor_id) {
            return Err(CoreError::InvalidBooking {
                booking_id,
                actor_id,
            });
        }

        if !booking.status.occupies_slot() {
            return Err(CoreError::Validation(format!(
                "booking {} is {} and cannot be confirmed",
                booking.booking_number, booking.status
            )));
        }

        if self
            .store
            .mark_confirmed(booking_id, party, self.clock.now())
            .await?
        {
            info!("Booking {} confirmed by {:?} {}", booking.booking_number, party, actor_id);
        }

        self.evaluate_completion(booking_id).await
    }

    /// Status change that also reports whether this call performed the transition.
    pub(crate) async fn apply_status(
        &self,
        booking_id: Uuid,
        to: BookingStatus,
        actor_id: Option<Uuid>,
    ) -> CoreResult<(Booking, bool)> {
        let mut booking = self.get(booking_id).await?;

        if booking.status == to {
            return Ok((booking, false));
        }
        if booking.status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: booking.status,
                to,
            });
        }

        let now = self.clock.now();
        let from = booking.status;
        if !self
            .store
            .transition_status(booking_id, from, to, actor_id, now)
            .await?
        {
            // Someone else moved it first; report their outcome.
            let current = self.get(booking_id).await?;
            if current.status == to {
                return Ok((current, false));
            }
            return Err(CoreError::InvalidTransition {
                from: current.status,
                to,
            });
        }

        booking.apply_status(to, actor_id, now);
        info!("Booking {} moved {} -> {}", booking.booking_number, from, to);

        if to == BookingStatus::Completed {
            self.on_completed(&booking).await;
        }

        Ok((booking, true))
    }

    async fn on_completed(&self, booking: &Booking) {
        if let Err(e) = self
            .store
            .refresh_party_stats(booking.trainer_id, booking.parent_id)
            .await
        {
            warn!("Failed to refresh stats after completing {}: {}", booking.booking_number, e);
        }

        self.signals
            .emit(Signal::SessionCompleted {
                booking_id: booking.id,
                trainer_id: booking.trainer_id,
                parent_id: booking.parent_id,
                recurring_id: booking.recurring_id,
            });
        self.signals
            .emit(Signal::BookingCompleted {
                booking_id: booking.id,
                trainer_id: booking.trainer_id,
                parent_id: booking.parent_id,
            });
    }

    fn announce_created(&self, booking: &Booking) {
        self.signals
            .emit(Signal::BookingCreated {
                booking_id: booking.id,
                booking_number: booking.booking_number.clone(),
                trainer_id: booking.trainer_id,
                parent_id: booking.parent_id,
                recurring_id: booking.recurring_id,
            });
    }

    pub(crate) async fn resolve_rate(&self, trainer_id: Uuid) -> CoreResult<i64> {
        let trainer = self
            .trainers
            .get_trainer(trainer_id)
            .await?
            .ok_or(CoreError::InvalidTrainer(trainer_id))?;

        match trainer.hourly_rate_cents {
            Some(rate) if rate > 0 => Ok(rate),
            _ => Ok(self.settings.default_hourly_rate_cents().await?),
        }
    }

    /// One transactional attempt, plus a single retry on transient failure.
    async fn place(&self, draft: &BookingDraft) -> CoreResult<Booking> {
        let mut attempt = 1;
        loop {
            match self.try_place(draft).await {
                Ok(booking) => return Ok(booking),
                Err(StoreError::SlotTaken) => {
                    return Err(CoreError::SlotTaken {
                        trainer_id: draft.trainer_id,
                        session_date: draft.session_date,
                        start_time: draft.start_time,
                    })
                }
                Err(StoreError::Transient(e)) if attempt == 1 => {
                    warn!("Transient failure placing booking, retrying once: {}", e);
                    attempt += 1;
                }
                Err(e) => {
                    error!("Failed to place booking for trainer {}: {}", draft.trainer_id, e);
                    return Err(CoreError::Persistence(e.to_string()));
                }
            }
        }
    }

    async fn try_place(&self, draft: &BookingDraft) -> StoreResult<Booking> {
        let mut tx = self.ledger.begin(&draft.slot()).await?;

        let busy = match tx.is_busy().await {
            Ok(busy) => busy,
            Err(e) => {
                discard(tx).await;
                return Err(e);
            }
        };
        if busy {
            discard(tx).await;
            return Err(StoreError::SlotTaken);
        }

        let booking = draft.materialize(generate_booking_number(), self.clock.as_ref());
        if let Err(e) = tx.insert(&booking).await {
            discard(tx).await;
            return Err(e);
        }

        tx.commit().await?;
        Ok(booking)
    }
}

async fn discard(tx: Box<dyn SlotTransaction>) {
    if let Err(e) = tx.rollback().await {
        warn!("Rollback failed: {}", e);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use coachline_core::memory::InMemoryStore;
    use coachline_core::settings::StaticSettings;
    use coachline_core::signals::SignalRecorder;
    use coachline_core::{FixedClock, TrainerProfile};

    pub(crate) struct Harness {
        pub store: InMemoryStore,
        pub settings: Arc<StaticSettings>,
        pub recorder: Arc<SignalRecorder>,
        pub clock: Arc<FixedClock>,
        pub lifecycle: Arc<BookingLifecycle>,
        pub trainer_id: Uuid,
    }

    pub(crate) async fn harness() -> Harness {
        let store = InMemoryStore::new();
        let trainer_id = Uuid::new_v4();
        store
            .add_trainer(TrainerProfile {
                id: trainer_id,
                hourly_rate_cents: Some(8000),
                is_active: true,
            })
            .await;

        let settings = Arc::new(StaticSettings::new(25.0, 5000));
        let recorder = Arc::new(SignalRecorder::new());
        let signals = SignalBus::new();
        signals.subscribe(recorder.clone());
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2026, 5, 20).unwrap()));

        let lifecycle = Arc::new(BookingLifecycle::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            settings.clone(),
            signals,
            clock.clone(),
        ));

        Harness {
            store,
            settings,
            recorder,
            clock,
            lifecycle,
            trainer_id,
        }
    }

    pub(crate) fn request(trainer_id: Uuid, parent_id: Uuid) -> CreateBookingRequest {
        CreateBookingRequest {
            trainer_id: Some(trainer_id),
            parent_id: Some(parent_id),
            player_id: Some(Uuid::new_v4()),
            session_date: NaiveDate::from_ymd_opt(2026, 6, 1),
            start_time: NaiveTime::from_hms_opt(17, 0, 0),
            duration_minutes: None,
            location: Some("Riverside Park".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_booking_freezes_fee_split() {
        let h = harness().await;
        let receipt = h
            .lifecycle
            .create(request(h.trainer_id, Uuid::new_v4()))
            .await
            .unwrap();

        let booking = h.lifecycle.get(receipt.booking_id).await.unwrap();
        assert_eq!(booking.total_amount_cents, 8000);
        assert_eq!(booking.platform_fee_cents, 2000);
        assert_eq!(booking.trainer_payout_cents, 6000);
        assert_eq!(booking.end_time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        assert!(booking.booking_number.starts_with("CL"));
        assert_eq!(booking.booking_number.len(), 10);

        // Later policy changes do not touch existing bookings.
        h.settings.set_fee_percent(30.0);
        let booking = h.lifecycle.get(receipt.booking_id).await.unwrap();
        assert_eq!(booking.platform_fee_cents, 2000);
        assert_eq!(booking.platform_fee_percent, 25.0);

        h.lifecycle.signals().settled().await;
        assert_eq!(h.recorder.count("booking_created"), 1);
    }

    #[tokio::test]
    async fn test_missing_field_is_reported() {
        let h = harness().await;
        let mut req = request(h.trainer_id, Uuid::new_v4());
        req.start_time = None;

        let err = h.lifecycle.create(req).await.unwrap_err();
        assert!(matches!(err, CoreError::MissingField("start_time")));
        assert!(h.store.all_bookings().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_trainer() {
        let h = harness().await;
        let err = h
            .lifecycle
            .create(request(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTrainer(_)));
    }

    #[tokio::test]
    async fn test_default_rate_when_trainer_has_none() {
        let h = harness().await;
        let trainer_id = Uuid::new_v4();
        h.store
            .add_trainer(TrainerProfile {
                id: trainer_id,
                hourly_rate_cents: None,
                is_active: true,
            })
            .await;

        let mut req = request(trainer_id, Uuid::new_v4());
        req.duration_minutes = Some(90);
        let receipt = h.lifecycle.create(req).await.unwrap();
        let booking = h.lifecycle.get(receipt.booking_id).await.unwrap();
        assert_eq!(booking.hourly_rate_cents, 5000);
        assert_eq!(booking.total_amount_cents, 7500);
    }

    #[tokio::test]
    async fn test_second_request_for_same_slot_conflicts() {
        let h = harness().await;
        h.lifecycle
            .create(request(h.trainer_id, Uuid::new_v4()))
            .await
            .unwrap();

        let err = h
            .lifecycle
            .create(request(h.trainer_id, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(h.store.all_bookings().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_book_slot_once() {
        let h = harness().await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lifecycle = h.lifecycle.clone();
                let req = request(h.trainer_id, Uuid::new_v4());
                tokio::spawn(async move { lifecycle.create(req).await })
            })
            .collect();

        let results = futures_util::future::join_all(handles).await;
        let mut ok = 0;
        let mut conflicts = 0;
        for result in results {
            match result.unwrap() {
                Ok(_) => ok += 1,
                Err(e) if e.is_conflict() => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(h.store.all_bookings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_slot_can_be_rebooked() {
        let h = harness().await;
        let parent_id = Uuid::new_v4();
        let receipt = h.lifecycle.create(request(h.trainer_id, parent_id)).await.unwrap();

        let cancelled = h
            .lifecycle
            .update_status(receipt.booking_id, BookingStatus::Cancelled, Some(parent_id))
            .await
            .unwrap();
        assert_eq!(cancelled.cancelled_by, Some(parent_id));
        assert!(cancelled.cancelled_at.is_some());

        assert!(h.lifecycle.create(request(h.trainer_id, Uuid::new_v4())).await.is_ok());
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let h = harness().await;
        h.store.fail_next_inserts(1).await;
        assert!(h.lifecycle.create(request(h.trainer_id, Uuid::new_v4())).await.is_ok());

        let mut req = request(h.trainer_id, Uuid::new_v4());
        req.start_time = NaiveTime::from_hms_opt(19, 0, 0);
        h.store.fail_next_inserts(2).await;
        let err = h.lifecycle.create(req).await.unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));
        assert_eq!(h.store.all_bookings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_status_cannot_change() {
        let h = harness().await;
        let receipt = h
            .lifecycle
            .create(request(h.trainer_id, Uuid::new_v4()))
            .await
            .unwrap();

        h.lifecycle
            .update_status(receipt.booking_id, BookingStatus::NoShow, None)
            .await
            .unwrap();
        let err = h
            .lifecycle
            .update_status(receipt.booking_id, BookingStatus::Confirmed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_status_update_cannot_complete() {
        let h = harness().await;
        let parent_id = Uuid::new_v4();
        let receipt = h.lifecycle.create(request(h.trainer_id, parent_id)).await.unwrap();

        let err = h
            .lifecycle
            .update_status(receipt.booking_id, BookingStatus::Completed, Some(parent_id))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        let err = h
            .lifecycle
            .update_status_str(receipt.booking_id, " Completed ", Some(h.trainer_id))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        // The confirmation protocol still completes it and releases payout.
        h.lifecycle
            .confirm_by_parent(receipt.booking_id, parent_id)
            .await
            .unwrap();
        let booking = h
            .lifecycle
            .confirm_by_trainer(receipt.booking_id, h.trainer_id)
            .await
            .unwrap();
        h.lifecycle.signals().settled().await;

        assert_eq!(booking.status, BookingStatus::Completed);
        assert_eq!(h.recorder.count("ready_for_payout"), 1);
    }

    #[tokio::test]
    async fn test_completion_updates_stats_and_signals() {
        let h = harness().await;
        let parent_id = Uuid::new_v4();
        let receipt = h.lifecycle.create(request(h.trainer_id, parent_id)).await.unwrap();
        h.clock.advance(Duration::days(13));

        h.lifecycle
            .confirm_by_parent(receipt.booking_id, parent_id)
            .await
            .unwrap();
        h.lifecycle
            .confirm_by_trainer(receipt.booking_id, h.trainer_id)
            .await
            .unwrap();
        h.lifecycle.signals().settled().await;

        assert_eq!(h.recorder.count("session_completed"), 1);
        assert_eq!(h.recorder.count("booking_completed"), 1);

        let stats = h.store.get_trainer_stats(h.trainer_id).await.unwrap().unwrap();
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.total_earnings_cents, 6000);
        let parent = h.store.get_parent_stats(parent_id).await.unwrap().unwrap();
        assert_eq!(parent.total_spent_cents, 8000);
    }

    struct SlowNotifier;

    #[async_trait::async_trait]
    impl coachline_core::SignalListener for SlowNotifier {
        fn name(&self) -> &'static str {
            "slow_notifier"
        }

        async fn handle(
            &self,
            _signal: &Signal,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_listener_does_not_delay_create() {
        let h = harness().await;
        h.lifecycle.signals().subscribe(Arc::new(SlowNotifier));

        let created = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            h.lifecycle.create(request(h.trainer_id, Uuid::new_v4())),
        )
        .await;
        assert!(created.expect("create waited on a listener").is_ok());
    }
}
