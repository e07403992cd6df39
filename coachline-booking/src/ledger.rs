use chrono::{NaiveDate, NaiveTime};
use coachline_core::repository::{BookingStore, SlotTransaction, StoreResult};
use coachline_core::Slot;
use std::sync::Arc;
use uuid::Uuid;

/// Authoritative answer to "is this trainer busy at this date and time".
///
/// `is_busy` is a plain read for previews and availability listings. Any
/// path that goes on to insert a booking must use `begin` and re-check inside
/// the returned transaction.
#[derive(Clone)]
pub struct SlotLedger {
    store: Arc<dyn BookingStore>,
}

impl SlotLedger {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn is_busy(
        &self,
        trainer_id: Uuid,
        session_date: NaiveDate,
        start_time: NaiveTime,
    ) -> StoreResult<bool> {
        self.store
            .is_busy(&Slot::new(trainer_id, session_date, start_time))
            .await
    }

    /// Open a transaction holding the slot's write lock.
    pub async fn begin(&self, slot: &Slot) -> StoreResult<Box<dyn SlotTransaction>> {
        self.store.begin_slot(slot).await
    }
}
