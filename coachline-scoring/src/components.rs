//! Pure score components. Each returns a value in 0..=100.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use coachline_core::{Booking, BookingStatus, TrainerScore};
use std::collections::HashMap;
use uuid::Uuid;

pub const RELIABILITY_WINDOW_DAYS: i64 = 90;
pub const RESPONSIVENESS_WINDOW_DAYS: i64 = 30;

pub const RELIABILITY_WEIGHT: f64 = 0.35;
pub const RESPONSIVENESS_WEIGHT: f64 = 0.25;
pub const RETURN_RATE_WEIGHT: f64 = 0.25;
pub const RATING_WEIGHT: f64 = 0.15;

pub const TRAINER_CANCEL_PENALTY: f64 = 30.0;
pub const NO_SHOW_PENALTY: f64 = 50.0;

/// Rating score used until the first review arrives.
pub const NEUTRAL_RATING_SCORE: f64 = 80.0;

pub const ELITE_COMPOSITE_THRESHOLD: i32 = 85;
pub const ELITE_MIN_COMPLETED_SESSIONS: usize = 25;
pub const ELITE_MIN_RATING: f64 = 4.5;

/// Everything the scorer reads for one trainer.
#[derive(Debug, Clone)]
pub struct ScoreInputs {
    pub trainer_id: Uuid,
    pub bookings: Vec<Booking>,
    pub average_rating: Option<f64>,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

impl ScoreInputs {
    pub fn score(&self) -> TrainerScore {
        let reliability = reliability(self.trainer_id, &self.bookings, self.today);
        let responsiveness = responsiveness(&self.bookings, self.now);
        let return_rate = return_rate(&self.bookings);
        let rating = rating_score(self.average_rating);

        TrainerScore {
            reliability,
            responsiveness,
            return_rate,
            rating,
            composite: composite(reliability, responsiveness, return_rate, rating),
            is_elite: false,
            elite_awarded_at: None,
            computed_at: Some(self.now),
        }
    }

    pub fn completed_sessions(&self) -> usize {
        self.bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Completed)
            .count()
    }

    /// Threshold check only; the grant itself is sticky and handled by the store.
    pub fn is_elite_eligible(&self, composite: i32) -> bool {
        composite >= ELITE_COMPOSITE_THRESHOLD
            && self.completed_sessions() >= ELITE_MIN_COMPLETED_SESSIONS
            && self.average_rating.is_some_and(|r| r >= ELITE_MIN_RATING)
    }
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Completion rate over sessions due in the trailing 90 days, less penalties
/// for trainer cancellations and no-shows.
pub fn reliability(trainer_id: Uuid, bookings: &[Booking], today: NaiveDate) -> f64 {
    let since = today - Duration::days(RELIABILITY_WINDOW_DAYS);
    let window: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.session_date >= since && b.session_date <= today)
        .collect();

    if window.is_empty() {
        return 100.0;
    }

    let total = window.len() as f64;
    let completed = window
        .iter()
        .filter(|b| b.status == BookingStatus::Completed)
        .count() as f64;
    let trainer_cancelled = window
        .iter()
        .filter(|b| b.status == BookingStatus::Cancelled && b.cancelled_by == Some(trainer_id))
        .count() as f64;
    let no_shows = window
        .iter()
        .filter(|b| b.status == BookingStatus::NoShow)
        .count() as f64;

    let penalty = TRAINER_CANCEL_PENALTY * (trainer_cancelled / total) + NO_SHOW_PENALTY * (no_shows / total);
    clamp_score(completed / total * 100.0 - penalty)
}

/// Piecewise-linear map from average hours-to-confirm onto 0..=100.
pub fn responsiveness_from_hours(hours: f64) -> f64 {
    let score = if hours < 1.0 {
        100.0
    } else if hours < 4.0 {
        100.0 - (hours - 1.0) / 3.0 * 10.0
    } else if hours < 12.0 {
        90.0 - (hours - 4.0) / 8.0 * 20.0
    } else if hours < 24.0 {
        70.0 - (hours - 12.0) / 12.0 * 20.0
    } else {
        // Loses the remaining 50 points over the following day.
        50.0 - (hours - 24.0) / 24.0 * 50.0
    };
    clamp_score(score)
}

pub fn responsiveness(bookings: &[Booking], now: DateTime<Utc>) -> f64 {
    let since = now - Duration::days(RESPONSIVENESS_WINDOW_DAYS);
    let delays: Vec<f64> = bookings
        .iter()
        .filter(|b| b.created_at >= since)
        .filter_map(|b| b.trainer_confirmed_at.map(|at| at - b.created_at))
        .map(|delay| (delay.num_seconds().max(0) as f64) / 3600.0)
        .collect();

    if delays.is_empty() {
        return 100.0;
    }
    let average = delays.iter().sum::<f64>() / delays.len() as f64;
    responsiveness_from_hours(average)
}

/// Share of distinct parents who came back for a second session, all-time.
pub fn return_rate(bookings: &[Booking]) -> f64 {
    let mut per_parent: HashMap<Uuid, u32> = HashMap::new();
    for booking in bookings {
        if !matches!(booking.status, BookingStatus::Completed | BookingStatus::Confirmed) {
            continue;
        }
        if let Some(parent_id) = booking.parent_id {
            *per_parent.entry(parent_id).or_default() += 1;
        }
    }

    if per_parent.is_empty() {
        return 100.0;
    }
    let returning = per_parent.values().filter(|count| **count >= 2).count() as f64;
    clamp_score(returning / per_parent.len() as f64 * 100.0)
}

pub fn rating_score(average_rating: Option<f64>) -> f64 {
    match average_rating {
        Some(avg) => clamp_score(avg / 5.0 * 100.0),
        None => NEUTRAL_RATING_SCORE,
    }
}

pub fn composite(reliability: f64, responsiveness: f64, return_rate: f64, rating: f64) -> i32 {
    let weighted = reliability * RELIABILITY_WEIGHT
        + responsiveness * RESPONSIVENESS_WEIGHT
        + return_rate * RETURN_RATE_WEIGHT
        + rating * RATING_WEIGHT;
    clamp_score(weighted).round() as i32
}
