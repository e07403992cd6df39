use coachline_core::StoreError;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::BusinessRules;

/// Partial unique index guarding one live booking per slot.
pub const SLOT_INDEX: &str = "bookings_live_slot_idx";

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlay rules stored in the `business_rules` table onto the configured defaults.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows: Vec<(String, Value)> =
            sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
                .fetch_all(&self.pool)
                .await?;

        let mut rules = defaults;

        for (rule_key, rule_value) in rows {
            // Expected format: {"value": <number>}
            let Some(v) = rule_value.get("value") else {
                continue;
            };
            match rule_key.as_str() {
                "platform_fee_percent" => {
                    if let Some(f) = v.as_f64() {
                        rules.platform_fee_percent = f;
                    }
                }
                "default_hourly_rate_cents" => {
                    if let Some(n) = v.as_i64() {
                        rules.default_hourly_rate_cents = n;
                    }
                }
                "recurring_window" => {
                    if let Some(n) = v.as_u64() {
                        rules.recurring_window = n as u32;
                    }
                }
                _ => {}
            }
        }

        Ok(rules)
    }
}

/// Classify a driver error for the retry policy.
pub(crate) fn map_sqlx(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") if db.constraint() == Some(SLOT_INDEX) => StoreError::SlotTaken,
            // Booking number collision; a retry draws a fresh one.
            Some("23505") => StoreError::Transient(db.message().to_string()),
            Some("40001") | Some("40P01") => StoreError::Transient(db.message().to_string()),
            _ => StoreError::Fatal(err.to_string()),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Transient(err.to_string()),
        _ => StoreError::Fatal(err.to_string()),
    }
}
