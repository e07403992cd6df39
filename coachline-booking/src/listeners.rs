use async_trait::async_trait;
use coachline_core::payout::PayoutAdapter;
use coachline_core::SignalListener;
use coachline_shared::Signal;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

use crate::recurring::RecurringEngine;

/// Hands the trainer's share to the payout provider once a booking is ready.
pub struct PayoutListener {
    adapter: Arc<dyn PayoutAdapter>,
}

impl PayoutListener {
    pub fn new(adapter: Arc<dyn PayoutAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl SignalListener for PayoutListener {
    fn name(&self) -> &'static str {
        "payout"
    }

    async fn handle(&self, signal: &Signal) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Signal::ReadyForPayout {
            booking_id,
            trainer_id,
            trainer_payout_cents,
        } = signal
        {
            let receipt = self
                .adapter
                .release_funds(*booking_id, *trainer_id, *trainer_payout_cents)
                .await?;
            info!(
                "Payout {} released for booking {} ({} cents)",
                receipt.reference, booking_id, receipt.amount_cents
            );
        }
        Ok(())
    }
}

/// Counts completed occurrences against their series budget.
pub struct SeriesProgressListener {
    engine: Weak<RecurringEngine>,
}

impl SeriesProgressListener {
    pub fn new(engine: &Arc<RecurringEngine>) -> Self {
        Self {
            engine: Arc::downgrade(engine),
        }
    }
}

#[async_trait]
impl SignalListener for SeriesProgressListener {
    fn name(&self) -> &'static str {
        "series_progress"
    }

    async fn handle(&self, signal: &Signal) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Signal::SessionCompleted {
            booking_id,
            recurring_id: Some(_),
            ..
        } = signal
        else {
            return Ok(());
        };

        match self.engine.upgrade() {
            Some(engine) => {
                engine.process_completion(*booking_id).await?;
            }
            None => debug!("Recurring engine dropped, ignoring completion of {}", booking_id),
        }
        Ok(())
    }
}
