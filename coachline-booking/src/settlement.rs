use coachline_core::{Booking, BookingStatus, CoreResult};
use coachline_shared::Signal;
use tracing::info;
use uuid::Uuid;

use crate::lifecycle::BookingLifecycle;

impl BookingLifecycle {
    /// Complete the booking once both sides have confirmed.
    ///
    /// Safe to call any number of times: completion and the payout signal
    /// happen at most once per booking.
    pub async fn evaluate_completion(&self, booking_id: Uuid) -> CoreResult<Booking> {
        let booking = self.get(booking_id).await?;

        if !booking.is_fully_confirmed() || booking.status.is_terminal() {
            return Ok(booking);
        }

        let (booking, transitioned) = self
            .apply_status(booking_id, BookingStatus::Completed, None)
            .await?;

        if transitioned {
            info!(
                "Booking {} confirmed by both sides, releasing {} cents to trainer {}",
                booking.booking_number, booking.trainer_payout_cents, booking.trainer_id
            );
            self.signals()
                .emit(Signal::ReadyForPayout {
                    booking_id: booking.id,
                    trainer_id: booking.trainer_id,
                    trainer_payout_cents: booking.trainer_payout_cents,
                });
        }

        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use crate::lifecycle::tests::{harness, request};
    use crate::listeners::PayoutListener;
    use coachline_core::payout::MockPayoutAdapter;
    use coachline_core::{BookingStatus, CoreError};
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_completion_requires_both_confirmations() {
        let h = harness().await;
        let parent_id = Uuid::new_v4();
        let receipt = h.lifecycle.create(request(h.trainer_id, parent_id)).await.unwrap();

        let booking = h
            .lifecycle
            .confirm_by_parent(receipt.booking_id, parent_id)
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert!(booking.parent_confirmed);
        h.lifecycle.signals().settled().await;
        assert_eq!(h.recorder.count("ready_for_payout"), 0);

        let booking = h
            .lifecycle
            .confirm_by_trainer(receipt.booking_id, h.trainer_id)
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
        h.lifecycle.signals().settled().await;
        assert_eq!(h.recorder.count("ready_for_payout"), 1);
        assert_eq!(h.recorder.count("session_completed"), 1);
    }

    #[tokio::test]
    async fn test_repeat_confirmation_is_idempotent() {
        let h = harness().await;
        let parent_id = Uuid::new_v4();
        let receipt = h.lifecycle.create(request(h.trainer_id, parent_id)).await.unwrap();

        h.lifecycle
            .confirm_by_trainer(receipt.booking_id, h.trainer_id)
            .await
            .unwrap();
        h.lifecycle
            .confirm_by_parent(receipt.booking_id, parent_id)
            .await
            .unwrap();

        // Duplicate webhook deliveries
        for _ in 0..3 {
            let booking = h
                .lifecycle
                .confirm_by_parent(receipt.booking_id, parent_id)
                .await
                .unwrap();
            assert_eq!(booking.status, BookingStatus::Completed);
        }
        h.lifecycle.evaluate_completion(receipt.booking_id).await.unwrap();
        h.lifecycle.signals().settled().await;

        assert_eq!(h.recorder.count("ready_for_payout"), 1);
        assert_eq!(h.recorder.count("booking_completed"), 1);
    }

    #[tokio::test]
    async fn test_confirmation_checks_ownership() {
        let h = harness().await;
        let parent_id = Uuid::new_v4();
        let receipt = h.lifecycle.create(request(h.trainer_id, parent_id)).await.unwrap();

        let err = h
            .lifecycle
            .confirm_by_parent(receipt.booking_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidBooking { .. }));

        // A trainer cannot confirm the parent's side.
        let err = h
            .lifecycle
            .confirm_by_parent(receipt.booking_id, h.trainer_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidBooking { .. }));

        let booking = h.lifecycle.get(receipt.booking_id).await.unwrap();
        assert!(!booking.parent_confirmed);
    }

    #[tokio::test]
    async fn test_cancelled_booking_cannot_be_confirmed() {
        let h = harness().await;
        let parent_id = Uuid::new_v4();
        let receipt = h.lifecycle.create(request(h.trainer_id, parent_id)).await.unwrap();
        h.lifecycle
            .update_status(receipt.booking_id, BookingStatus::Cancelled, Some(parent_id))
            .await
            .unwrap();

        let err = h
            .lifecycle
            .confirm_by_trainer(receipt.booking_id, h.trainer_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_payout_failure_does_not_undo_completion() {
        let h = harness().await;
        let adapter = Arc::new(MockPayoutAdapter::failing());
        h.lifecycle
            .signals()
            .subscribe(Arc::new(PayoutListener::new(adapter.clone())));

        let parent_id = Uuid::new_v4();
        let receipt = h.lifecycle.create(request(h.trainer_id, parent_id)).await.unwrap();
        h.lifecycle
            .confirm_by_parent(receipt.booking_id, parent_id)
            .await
            .unwrap();
        let booking = h
            .lifecycle
            .confirm_by_trainer(receipt.booking_id, h.trainer_id)
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Completed);
        h.lifecycle.signals().settled().await;
        assert!(adapter.released().is_empty());
        let stored = h.lifecycle.get(receipt.booking_id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn test_payout_released_for_trainer_share() {
        let h = harness().await;
        let adapter = Arc::new(MockPayoutAdapter::new());
        h.lifecycle
            .signals()
            .subscribe(Arc::new(PayoutListener::new(adapter.clone())));

        let parent_id = Uuid::new_v4();
        let receipt = h.lifecycle.create(request(h.trainer_id, parent_id)).await.unwrap();
        h.lifecycle
            .confirm_by_parent(receipt.booking_id, parent_id)
            .await
            .unwrap();
        h.lifecycle
            .confirm_by_trainer(receipt.booking_id, h.trainer_id)
            .await
            .unwrap();
        h.lifecycle.signals().settled().await;

        assert_eq!(adapter.released(), vec![receipt.booking_id]);
    }
}
