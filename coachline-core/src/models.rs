use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

/// One bookable unit of a trainer's time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub trainer_id: Uuid,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
}

impl Slot {
    pub fn new(trainer_id: Uuid, session_date: NaiveDate, start_time: NaiveTime) -> Self {
        Self {
            trainer_id,
            session_date,
            start_time,
        }
    }

    /// Key used for advisory locking; identical slots always produce the same key.
    pub fn lock_key(&self) -> String {
        format!(
            "slot:{}:{}:{}",
            self.trainer_id,
            self.session_date,
            self.start_time.format("%H:%M:%S")
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    /// Whether a booking in this status keeps its slot busy.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::NoShow)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "no_show" => Ok(BookingStatus::NoShow),
            other => Err(CoreError::Validation(format!("unknown booking status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(CoreError::Validation(format!("unknown payment status '{}'", other))),
        }
    }
}

/// Side of the dual confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Parent,
    Trainer,
}

/// A single scheduled session. Money fields are cents and are frozen at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub trainer_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub player_id: Option<Uuid>,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub hourly_rate_cents: i64,
    pub total_amount_cents: i64,
    pub platform_fee_cents: i64,
    pub trainer_payout_cents: i64,
    pub platform_fee_percent: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub parent_confirmed: bool,
    pub parent_confirmed_at: Option<DateTime<Utc>>,
    pub trainer_confirmed: bool,
    pub trainer_confirmed_at: Option<DateTime<Utc>>,
    pub recurring_id: Option<Uuid>,
    pub is_recurring: bool,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn slot(&self) -> Slot {
        Slot::new(self.trainer_id, self.session_date, self.start_time)
    }

    pub fn is_fully_confirmed(&self) -> bool {
        self.parent_confirmed && self.trainer_confirmed
    }

    pub fn is_confirmed_by(&self, party: Party) -> bool {
        match party {
            Party::Parent => self.parent_confirmed,
            Party::Trainer => self.trainer_confirmed,
        }
    }

    /// Set one confirmation flag. Returns false when it was already set.
    pub fn confirm(&mut self, party: Party, at: DateTime<Utc>) -> bool {
        let (flag, stamp) = match party {
            Party::Parent => (&mut self.parent_confirmed, &mut self.parent_confirmed_at),
            Party::Trainer => (&mut self.trainer_confirmed, &mut self.trainer_confirmed_at),
        };
        if *flag {
            return false;
        }
        *flag = true;
        *stamp = Some(at);
        self.updated_at = at;
        true
    }

    /// Apply a status change, stamping the cancelling actor when relevant.
    pub fn apply_status(&mut self, to: BookingStatus, actor: Option<Uuid>, at: DateTime<Utc>) {
        self.status = to;
        if to == BookingStatus::Cancelled {
            self.cancelled_by = actor;
            self.cancelled_at = Some(at);
        }
        self.updated_at = at;
    }
}

/// Interval between recurring occurrences.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Weekly,
    Biweekly,
}

impl Cadence {
    pub fn days(&self) -> i64 {
        match self {
            Cadence::Weekly => 7,
            Cadence::Biweekly => 14,
        }
    }

    pub fn step(&self) -> Duration {
        Duration::days(self.days())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Weekly => "weekly",
            Cadence::Biweekly => "biweekly",
        }
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence::Weekly
    }
}

impl FromStr for Cadence {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Cadence::Weekly),
            "biweekly" | "bi-weekly" | "bi_weekly" => Ok(Cadence::Biweekly),
            other => Err(CoreError::Validation(format!("unknown cadence '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl SeriesStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesStatus::Active => "active",
            SeriesStatus::Paused => "paused",
            SeriesStatus::Completed => "completed",
            SeriesStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SeriesStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SeriesStatus::Active),
            "paused" => Ok(SeriesStatus::Paused),
            "completed" => Ok(SeriesStatus::Completed),
            "cancelled" => Ok(SeriesStatus::Cancelled),
            other => Err(CoreError::Validation(format!("unknown series status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Upfront,
    PerSession,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Upfront => "upfront",
            PaymentType::PerSession => "per_session",
        }
    }

    /// Payment status stamped on each generated occurrence.
    pub fn occurrence_payment_status(&self) -> PaymentStatus {
        match self {
            PaymentType::Upfront => PaymentStatus::Paid,
            PaymentType::PerSession => PaymentStatus::Pending,
        }
    }
}

impl FromStr for PaymentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upfront" => Ok(PaymentType::Upfront),
            "per_session" => Ok(PaymentType::PerSession),
            other => Err(CoreError::Validation(format!("unknown payment type '{}'", other))),
        }
    }
}

/// A standing weekly or bi-weekly commitment between a parent and a trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringSeries {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub trainer_id: Uuid,
    pub player_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub cadence: Cadence,
    pub total_sessions: Option<i32>,
    pub sessions_remaining: Option<i32>,
    pub sessions_completed: i32,
    pub hourly_rate_cents: i64,
    pub status: SeriesStatus,
    pub start_date: NaiveDate,
    pub next_session_date: NaiveDate,
    pub payment_type: PaymentType,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringSeries {
    pub fn is_bounded(&self) -> bool {
        self.total_sessions.is_some()
    }

    /// Count one delivered session against the budget.
    pub fn record_completion(&mut self, at: DateTime<Utc>) {
        self.sessions_completed += 1;
        if let Some(remaining) = self.sessions_remaining.as_mut() {
            *remaining = (*remaining - 1).max(0);
            if *remaining == 0 && self.status == SeriesStatus::Active {
                self.status = SeriesStatus::Completed;
            }
        }
        self.updated_at = at;
    }
}

/// Day index with Sunday as 0.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Trainer-profile data the booking core reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerProfile {
    pub id: Uuid,
    pub hourly_rate_cents: Option<i64>,
    pub is_active: bool,
}

/// Derived quality projection embedded in the trainer profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainerScore {
    pub reliability: f64,
    pub responsiveness: f64,
    pub return_rate: f64,
    pub rating: f64,
    pub composite: i32,
    pub is_elite: bool,
    pub elite_awarded_at: Option<DateTime<Utc>>,
    pub computed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerStats {
    pub completed_sessions: i64,
    pub total_earnings_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentStats {
    pub completed_sessions: i64,
    pub total_spent_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(total: Option<i32>) -> RecurringSeries {
        let now = Utc::now();
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        RecurringSeries {
            id: Uuid::new_v4(),
            parent_id: Uuid::new_v4(),
            trainer_id: Uuid::new_v4(),
            player_id: None,
            package_id: None,
            day_of_week: 1,
            start_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            duration_minutes: 60,
            cadence: Cadence::Weekly,
            total_sessions: total,
            sessions_remaining: total,
            sessions_completed: 0,
            hourly_rate_cents: 8000,
            status: SeriesStatus::Active,
            start_date: start,
            next_session_date: start,
            payment_type: PaymentType::Upfront,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("no_show".parse::<BookingStatus>().unwrap(), BookingStatus::NoShow);
        assert!("done".parse::<BookingStatus>().is_err());
        assert!(BookingStatus::Completed.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
        assert!(BookingStatus::Pending.occupies_slot());
        assert!(!BookingStatus::NoShow.occupies_slot());
    }

    #[test]
    fn test_weekday_index_starts_on_sunday() {
        let monday = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert_eq!(weekday_index(monday), 1);
        assert_eq!(weekday_index(monday - Duration::days(1)), 0);
    }

    #[test]
    fn test_bounded_series_completes_on_last_session() {
        let mut s = series(Some(2));
        s.record_completion(Utc::now());
        assert_eq!(s.sessions_remaining, Some(1));
        assert_eq!(s.status, SeriesStatus::Active);

        s.record_completion(Utc::now());
        assert_eq!(s.sessions_remaining, Some(0));
        assert_eq!(s.sessions_completed, 2);
        assert_eq!(s.status, SeriesStatus::Completed);
    }

    #[test]
    fn test_unbounded_series_never_completes() {
        let mut s = series(None);
        for _ in 0..10 {
            s.record_completion(Utc::now());
        }
        assert_eq!(s.sessions_remaining, None);
        assert_eq!(s.sessions_completed, 10);
        assert_eq!(s.status, SeriesStatus::Active);
    }
}
