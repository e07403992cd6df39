use chrono::{Duration, NaiveTime};
use coachline_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_MINUTES: i32 = 60;
pub const MAX_DURATION_MINUTES: i32 = 12 * 60;

/// Money snapshot frozen into a booking at creation. All amounts are cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub hourly_rate_cents: i64,
    pub total_amount_cents: i64,
    pub platform_fee_cents: i64,
    pub trainer_payout_cents: i64,
    pub fee_percent: f64,
}

impl FeeSplit {
    /// Price a session: total from the hourly rate, fee from the current
    /// platform percentage, payout as the exact remainder.
    pub fn compute(hourly_rate_cents: i64, duration_minutes: i32, fee_percent: f64) -> CoreResult<Self> {
        if !(0.0..=100.0).contains(&fee_percent) {
            return Err(CoreError::Validation(format!(
                "platform fee percent {} out of range",
                fee_percent
            )));
        }
        if hourly_rate_cents < 0 {
            return Err(CoreError::Validation("hourly rate cannot be negative".to_string()));
        }

        let total_amount_cents =
            ((hourly_rate_cents as f64) * (duration_minutes as f64) / 60.0).round() as i64;
        let platform_fee_cents = ((total_amount_cents as f64) * fee_percent / 100.0).round() as i64;

        Ok(Self {
            hourly_rate_cents,
            total_amount_cents,
            platform_fee_cents,
            trainer_payout_cents: total_amount_cents - platform_fee_cents,
            fee_percent,
        })
    }
}

/// End of a session starting at `start`. Sessions may not run past midnight.
pub fn session_end(start: NaiveTime, duration_minutes: i32) -> CoreResult<NaiveTime> {
    if !(1..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(CoreError::Validation(format!(
            "duration must be between 1 and {} minutes",
            MAX_DURATION_MINUTES
        )));
    }

    let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(duration_minutes as i64));
    if wrapped != 0 {
        return Err(CoreError::Validation("session cannot cross midnight".to_string()));
    }
    Ok(end)
}
