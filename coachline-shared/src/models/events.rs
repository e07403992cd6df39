use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outbound notifications emitted after a booking state change has committed.
///
/// Consumers (email, SMS, payout, analytics) treat these as fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    BookingCreated {
        booking_id: Uuid,
        booking_number: String,
        trainer_id: Uuid,
        parent_id: Option<Uuid>,
        recurring_id: Option<Uuid>,
    },
    BookingCompleted {
        booking_id: Uuid,
        trainer_id: Uuid,
        parent_id: Option<Uuid>,
    },
    SessionCompleted {
        booking_id: Uuid,
        trainer_id: Uuid,
        parent_id: Option<Uuid>,
        recurring_id: Option<Uuid>,
    },
    ReadyForPayout {
        booking_id: Uuid,
        trainer_id: Uuid,
        trainer_payout_cents: i64,
    },
    EliteTierAwarded {
        trainer_id: Uuid,
        composite_score: i32,
        awarded_at: DateTime<Utc>,
    },
}

impl Signal {
    /// Stable name used as the message key when publishing.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::BookingCreated { .. } => "booking_created",
            Signal::BookingCompleted { .. } => "booking_completed",
            Signal::SessionCompleted { .. } => "session_completed",
            Signal::ReadyForPayout { .. } => "ready_for_payout",
            Signal::EliteTierAwarded { .. } => "elite_tier_awarded",
        }
    }

    /// Entity the signal is about, used as the partition key.
    pub fn subject_id(&self) -> Uuid {
        match self {
            Signal::BookingCreated { booking_id, .. }
            | Signal::BookingCompleted { booking_id, .. }
            | Signal::SessionCompleted { booking_id, .. }
            | Signal::ReadyForPayout { booking_id, .. } => *booking_id,
            Signal::EliteTierAwarded { trainer_id, .. } => *trainer_id,
        }
    }
}
