use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Released,
    Escrowed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub reference: String, // Provider's transfer id
    pub booking_id: Uuid,
    pub amount_cents: i64,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
}

/// Settlement collaborator that actually moves money to the trainer.
#[async_trait]
pub trait PayoutAdapter: Send + Sync {
    async fn release_funds(
        &self,
        booking_id: Uuid,
        trainer_id: Uuid,
        amount_cents: i64,
    ) -> Result<PayoutReceipt, Box<dyn std::error::Error + Send + Sync>>;
}

/// Records releases in memory; optionally fails every call.
#[derive(Default)]
pub struct MockPayoutAdapter {
    fail: bool,
    released: Mutex<Vec<Uuid>>,
}

impl MockPayoutAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            released: Mutex::new(Vec::new()),
        }
    }

    pub fn released(&self) -> Vec<Uuid> {
        self.released.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PayoutAdapter for MockPayoutAdapter {
    async fn release_funds(
        &self,
        booking_id: Uuid,
        _trainer_id: Uuid,
        amount_cents: i64,
    ) -> Result<PayoutReceipt, Box<dyn std::error::Error + Send + Sync>> {
        if self.fail {
            return Err("Simulated payout provider failure".into());
        }

        self.released
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(booking_id);

        Ok(PayoutReceipt {
            reference: format!("mock_tr_{}", booking_id.simple()),
            booking_id,
            amount_cents,
            status: PayoutStatus::Released,
            created_at: Utc::now(),
        })
    }
}

/// Records the intent to pay a trainer and moves no money. Each release is
/// logged and answered with an `Escrowed` receipt; wiring a real payment
/// provider means replacing this adapter.
pub struct EscrowPayoutAdapter;

#[async_trait]
impl PayoutAdapter for EscrowPayoutAdapter {
    async fn release_funds(
        &self,
        booking_id: Uuid,
        trainer_id: Uuid,
        amount_cents: i64,
    ) -> Result<PayoutReceipt, Box<dyn std::error::Error + Send + Sync>> {
        info!(
            "Escrowing {} cents for trainer {} (booking {})",
            amount_cents, trainer_id, booking_id
        );
        Ok(PayoutReceipt {
            reference: format!("escrow_{}", booking_id.simple()),
            booking_id,
            amount_cents,
            status: PayoutStatus::Escrowed,
            created_at: Utc::now(),
        })
    }
}
