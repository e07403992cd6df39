pub mod clock;
pub mod memory;
pub mod models;
pub mod payout;
pub mod repository;
pub mod settings;
pub mod signals;

pub use clock::{Clock, FixedClock, SystemClock};
pub use models::{
    Booking, BookingStatus, Cadence, Party, PaymentStatus, PaymentType, RecurringSeries,
    SeriesStatus, Slot, TrainerProfile, TrainerScore,
};
pub use repository::{StoreError, StoreResult};
pub use signals::{SignalBus, SignalListener};

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

/// Coarse classification callers use to decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Ownership,
    Persistence,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Slot taken: trainer {trainer_id} on {session_date} at {start_time}")]
    SlotTaken {
        trainer_id: Uuid,
        session_date: NaiveDate,
        start_time: NaiveTime,
    },

    #[error("Unknown trainer: {0}")]
    InvalidTrainer(Uuid),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Actor {actor_id} does not own booking {booking_id}")]
    InvalidBooking { booking_id: Uuid, actor_id: Uuid },

    #[error("Actor {actor_id} is not a party to series {series_id}")]
    InvalidSeries { series_id: Uuid, actor_id: Uuid },

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::MissingField(_)
            | CoreError::Validation(_)
            | CoreError::InvalidTransition { .. } => ErrorKind::Validation,
            CoreError::SlotTaken { .. } => ErrorKind::Conflict,
            CoreError::InvalidTrainer(_) | CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InvalidBooking { .. } | CoreError::InvalidSeries { .. } => {
                ErrorKind::Ownership
            }
            CoreError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub fn booking_not_found(id: Uuid) -> Self {
        CoreError::NotFound { entity: "Booking", id }
    }

    pub fn series_not_found(id: Uuid) -> Self {
        CoreError::NotFound { entity: "Recurring series", id }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::Persistence(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let conflict = CoreError::SlotTaken {
            trainer_id: Uuid::new_v4(),
            session_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        };
        assert!(conflict.is_conflict());
        assert_eq!(CoreError::MissingField("trainer_id").kind(), ErrorKind::Validation);
        assert_eq!(CoreError::booking_not_found(Uuid::new_v4()).kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::from(StoreError::Fatal("disk full".to_string())).kind(),
            ErrorKind::Persistence
        );
        assert!(!CoreError::Persistence("x".to_string()).is_conflict());
    }
}
